//! EVM-side execution for Hyperpool: ERC-20 and Multicall3 calldata
//! encoding, allowance management and the batched-vs-sequential swap
//! execution controller.

pub mod approval;
pub mod erc20;
pub mod executor;
pub mod multicall;

pub use approval::{ApprovalError, ApprovalManager};
pub use executor::{
    ApprovalMode, ExecutionController, ExecutionError, ExecutionOutcome, ExecutionPhase,
};

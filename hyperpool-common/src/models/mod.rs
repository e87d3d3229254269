pub mod investment;
pub mod pool;
pub mod token;

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Transaction hash literal type to uniquely identify a submitted
/// transaction on the chain.
pub type TxHash = B256;

/// Chain-level settings the execution engine needs: which network it signs
/// for and whether a batching contract is deployed there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSettings {
    pub chain_id: u64,
    /// Multicall3 deployment, if the chain has one. `None` disables the
    /// batched execution path entirely.
    pub multicall3: Option<Address>,
}

//! Multicall3 batching: collapses several swap legs into one atomic
//! transaction. Every call is marked must-not-fail, so a revert in any leg
//! reverts the whole batch; partial pool entry is considered worse than no
//! entry.

use alloy::{core::sol, sol_types::SolCall};
use alloy_primitives::{Address, U256};
use hyperpool_common::{dto::ExecutableQuote, traits::TransactionRequest};

// Multicall3 interface, standard deployment across most chains.
sol! {
    struct Call3 {
        address target;
        bool allowFailure;
        bytes callData;
    }

    struct Call3Value {
        address target;
        bool allowFailure;
        uint256 value;
        bytes callData;
    }

    struct CallResult {
        bool success;
        bytes returnData;
    }

    function aggregate3(Call3[] calldata calls) public payable returns (CallResult[] memory returnData);
    function aggregate3Value(Call3Value[] calldata calls) public payable returns (CallResult[] memory returnData);
}

/// Gas added on top of the summed leg estimates for the batching contract
/// itself.
const BATCH_GAS_OVERHEAD: u64 = 100_000;

/// Combines executable swap legs into a single Multicall3 transaction.
///
/// Legs that carry native value force the `aggregate3Value` form; otherwise
/// the plain `aggregate3` form is used. The transaction value is the sum of
/// leg values and the gas limit is the sum of leg estimates plus a fixed
/// overhead.
pub fn combine_execution_quotes(
    legs: &[ExecutableQuote],
    multicall: Address,
) -> TransactionRequest {
    let total_value = legs
        .iter()
        .fold(U256::ZERO, |sum, leg| sum + leg.price.native_value());

    let data = if total_value.is_zero() {
        let calls = legs
            .iter()
            .map(|leg| Call3 {
                target: leg.to,
                allowFailure: false,
                callData: leg.data.clone(),
            })
            .collect::<Vec<_>>();
        aggregate3Call { calls }.abi_encode()
    } else {
        let calls = legs
            .iter()
            .map(|leg| Call3Value {
                target: leg.to,
                allowFailure: false,
                value: leg.price.native_value(),
                callData: leg.data.clone(),
            })
            .collect::<Vec<_>>();
        aggregate3ValueCall { calls }.abi_encode()
    };

    let total_gas = legs
        .iter()
        .fold(U256::ZERO, |sum, leg| sum + leg.price.gas_estimate());

    TransactionRequest {
        to: multicall,
        data: data.into(),
        value: total_value,
        gas: Some(total_gas + U256::from(BATCH_GAS_OVERHEAD)),
    }
}

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{pool::PoolId, TxHash};

/// One completed pool entry, recorded after the final swap transaction was
/// accepted. Append-only; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecord {
    pub pool_id: PoolId,
    pub amount: f64,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    pub tx_id: TxHash,
}

impl InvestmentRecord {
    pub fn new(pool_id: PoolId, amount: f64, tx_id: TxHash) -> Self {
        Self { pool_id, amount, timestamp: Utc::now().timestamp_millis(), tx_id }
    }
}

/// Aggregate figures derived from an address's investment records.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentSummary {
    pub total_invested: f64,
    pub derived_earnings: f64,
    pub available_fees: f64,
}

/// The earnings formula is product policy, not a core algorithm, so it is a
/// projection plugged in over the ledger rather than baked into it.
pub trait EarningsPolicy: Send + Sync {
    /// Projects earnings and collectable fees from the invested total.
    fn project(&self, total_invested: f64) -> (f64, f64);
}

/// Flat-rate projection: a fixed earnings rate on the invested total, with
/// a fixed share of those earnings collectable as fees.
#[derive(Debug, Clone, Copy)]
pub struct FlatRatePolicy {
    pub earnings_rate: f64,
    pub fee_share: f64,
}

impl Default for FlatRatePolicy {
    fn default() -> Self {
        Self { earnings_rate: 0.05, fee_share: 0.1 }
    }
}

impl EarningsPolicy for FlatRatePolicy {
    fn project(&self, total_invested: f64) -> (f64, f64) {
        let earnings = total_invested * self.earnings_rate;
        (earnings, earnings * self.fee_share)
    }
}

/// Folds a record collection into aggregate figures, netting out fees that
/// were already collected.
pub fn summarize(
    records: &[InvestmentRecord],
    collected_fees: f64,
    policy: &dyn EarningsPolicy,
) -> InvestmentSummary {
    let total_invested: f64 = records
        .iter()
        .map(|record| record.amount)
        .sum();
    let (derived_earnings, projected_fees) = policy.project(total_invested);
    InvestmentSummary {
        total_invested,
        derived_earnings,
        available_fees: (projected_fees - collected_fees).max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(amount: f64) -> InvestmentRecord {
        InvestmentRecord::new(PoolId::new("usdc-hype-usdt"), amount, B256::repeat_byte(0xab))
    }

    #[test]
    fn test_summarize_flat_rate() {
        let records = vec![record(100.0), record(300.0)];

        let summary = summarize(&records, 0.0, &FlatRatePolicy::default());

        assert_eq!(summary.total_invested, 400.0);
        assert_eq!(summary.derived_earnings, 20.0);
        assert_eq!(summary.available_fees, 2.0);
    }

    #[test]
    fn test_summarize_nets_out_collected_fees() {
        let records = vec![record(400.0)];

        let summary = summarize(&records, 1.5, &FlatRatePolicy::default());
        assert_eq!(summary.available_fees, 0.5);

        let drained = summarize(&records, 10.0, &FlatRatePolicy::default());
        assert_eq!(drained.available_fees, 0.0);
    }

    #[test]
    fn test_record_wire_shape() {
        let record = InvestmentRecord {
            pool_id: PoolId::new("usdc-hype-usdt"),
            amount: 42.5,
            timestamp: 1_700_000_000_000,
            tx_id: B256::repeat_byte(0x11),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["poolId"], "usdc-hype-usdt");
        assert_eq!(json["amount"], 42.5);
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert!(json["txId"]
            .as_str()
            .unwrap()
            .starts_with("0x1111"));
    }
}

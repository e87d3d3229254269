//! File-backed investment ledger.
//!
//! One JSON document holds every wallet's record collection. The document
//! is shared with other processes for the same user, so it is re-read on
//! every call and writers only ever append to a collection; nothing updates
//! or deletes records in place.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use alloy_primitives::Address;
use hyperpool_common::{
    models::investment::{summarize, EarningsPolicy, InvestmentRecord, InvestmentSummary},
    traits::{LedgerError, LedgerStore},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    investments: HashMap<Address, Vec<InvestmentRecord>>,
    #[serde(default)]
    collected_fees: HashMap<Address, f64>,
}

/// Append-only ledger persisted as a single JSON document.
pub struct JsonLedger {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process; external
    // writers are picked up by the re-read on every call.
    write_lock: Mutex<()>,
}

impl JsonLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<LedgerDocument, LedgerError> {
        if !self.path.exists() {
            return Ok(LedgerDocument::default());
        }
        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(LedgerDocument::default());
        }
        Ok(serde_json::from_str(&raw)?)
    }

    fn store(&self, document: &LedgerDocument) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(document)?)?;
        Ok(())
    }

    /// Aggregate figures for `owner` under the given earnings policy.
    pub fn summarize(
        &self,
        owner: Address,
        policy: &dyn EarningsPolicy,
    ) -> Result<InvestmentSummary, LedgerError> {
        let document = self.load()?;
        let records = document
            .investments
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let collected = document
            .collected_fees
            .get(&owner)
            .copied()
            .unwrap_or(0.0);
        Ok(summarize(records, collected, policy))
    }

    /// Drains the owner's currently available fees, returning the collected
    /// amount.
    pub fn collect_fees(
        &self,
        owner: Address,
        policy: &dyn EarningsPolicy,
    ) -> Result<f64, LedgerError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let summary = self.summarize(owner, policy)?;
        if summary.available_fees <= 0.0 {
            return Ok(0.0);
        }
        let mut document = self.load()?;
        *document
            .collected_fees
            .entry(owner)
            .or_insert(0.0) += summary.available_fees;
        self.store(&document)?;
        debug!(%owner, amount = summary.available_fees, "Collected fees");
        Ok(summary.available_fees)
    }
}

impl LedgerStore for JsonLedger {
    fn record(&self, owner: Address, record: InvestmentRecord) -> Result<(), LedgerError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut document = self.load()?;
        document
            .investments
            .entry(owner)
            .or_default()
            .push(record);
        self.store(&document)?;
        debug!(%owner, path = %self.path.display(), "Recorded investment");
        Ok(())
    }

    fn list(&self, owner: Address) -> Result<Vec<InvestmentRecord>, LedgerError> {
        Ok(self
            .load()?
            .investments
            .get(&owner)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::B256;
    use hyperpool_common::models::{investment::FlatRatePolicy, pool::PoolId};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn owner() -> Address {
        "0x00000000000000000000000000000000000000aa"
            .parse()
            .unwrap()
    }

    fn record(amount: f64, tx_byte: u8) -> InvestmentRecord {
        InvestmentRecord::new(
            PoolId::new("usdc-hype-usdt"),
            amount,
            B256::repeat_byte(tx_byte),
        )
    }

    #[test]
    fn test_record_and_list_round_trip() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonLedger::new(dir.path().join("ledger.json"));

        ledger.record(owner(), record(100.0, 0x01)).unwrap();
        ledger.record(owner(), record(50.0, 0x02)).unwrap();

        let records = ledger.list(owner()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].amount, 100.0);
        assert_eq!(records[1].tx_id, B256::repeat_byte(0x02));
    }

    #[test]
    fn test_records_are_scoped_by_owner() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonLedger::new(dir.path().join("ledger.json"));
        let other: Address = "0x00000000000000000000000000000000000000bb"
            .parse()
            .unwrap();

        ledger.record(owner(), record(100.0, 0x01)).unwrap();

        assert_eq!(ledger.list(owner()).unwrap().len(), 1);
        assert!(ledger.list(other).unwrap().is_empty());
    }

    #[test]
    fn test_external_writes_are_observed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        let writer = JsonLedger::new(&path);
        let reader = JsonLedger::new(&path);

        assert!(reader.list(owner()).unwrap().is_empty());
        writer.record(owner(), record(100.0, 0x01)).unwrap();

        // The reader holds no cache; the record written through the other
        // handle is visible immediately.
        assert_eq!(reader.list(owner()).unwrap().len(), 1);
    }

    #[test]
    fn test_summarize_and_collect_fees() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonLedger::new(dir.path().join("ledger.json"));
        let policy = FlatRatePolicy::default();

        ledger.record(owner(), record(400.0, 0x01)).unwrap();

        let summary = ledger.summarize(owner(), &policy).unwrap();
        assert_eq!(summary.total_invested, 400.0);
        assert_eq!(summary.derived_earnings, 20.0);
        assert_eq!(summary.available_fees, 2.0);

        let collected = ledger.collect_fees(owner(), &policy).unwrap();
        assert_eq!(collected, 2.0);

        let drained = ledger.summarize(owner(), &policy).unwrap();
        assert_eq!(drained.available_fees, 0.0);
        // Nothing left to collect on the second pass.
        assert_eq!(ledger.collect_fees(owner(), &policy).unwrap(), 0.0);
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = JsonLedger::new(dir.path().join("absent.json"));

        assert!(ledger.list(owner()).unwrap().is_empty());
        let summary = ledger
            .summarize(owner(), &FlatRatePolicy::default())
            .unwrap();
        assert_eq!(summary, InvestmentSummary::default());
    }
}

//! Durable storage for the Hyperpool investment ledger.

pub mod ledger;

pub use ledger::JsonLedger;

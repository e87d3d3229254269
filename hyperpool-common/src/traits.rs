use alloy_primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{investment::InvestmentRecord, TxHash};

/// A transaction handed to the wallet for signing and submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Explicit gas limit; `None` leaves estimation to the wallet.
    pub gas: Option<U256>,
}

/// Terminal state of a confirmed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Reverted,
}

#[derive(Error, Debug)]
pub enum WalletError {
    /// The user dismissed the wallet prompt without signing.
    #[error("transaction rejected by user")]
    Rejected,

    /// The account cannot cover gas for the transaction.
    #[error("insufficient funds for gas")]
    InsufficientFunds,

    /// Errors forwarded from the underlying RPC transport.
    #[error("wallet rpc error: {0}")]
    Rpc(String),
}

/// The wallet-signing capability the engine executes through.
///
/// This is a singleton external resource: callers must never have two
/// `send_transaction` calls in flight at once, since concurrent signing
/// requests against one wallet session are unsafe and many wallets reject
/// them outright.
#[cfg_attr(feature = "test-utils", mockall::automock)]
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// The currently connected account.
    fn address(&self) -> Address;

    /// Read-only contract call (eth_call style), returning the raw return
    /// data.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, WalletError>;

    /// Submits a transaction. Suspends until the wallet UI is dismissed;
    /// resolves with the transaction hash once the transaction is accepted.
    async fn send_transaction(&self, request: TransactionRequest)
        -> Result<TxHash, WalletError>;

    /// Blocks until one confirmation of the given transaction is observed.
    async fn wait_for_confirmation(&self, tx_hash: TxHash) -> Result<TxStatus, WalletError>;
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("ledger io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Durable, append-only store of completed investments, keyed by wallet
/// address. The backing document is shared with other contexts, so
/// implementations re-read it on every call instead of caching.
#[cfg_attr(feature = "test-utils", mockall::automock)]
pub trait LedgerStore: Send + Sync {
    /// Appends a record to the owner's collection.
    fn record(&self, owner: Address, record: InvestmentRecord) -> Result<(), LedgerError>;

    /// All records for the owner, in insertion order.
    fn list(&self, owner: Address) -> Result<Vec<InvestmentRecord>, LedgerError>;
}

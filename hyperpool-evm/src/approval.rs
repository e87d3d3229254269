//! Per (token, spender) allowance checks and approval transactions.
//!
//! Allowance is never cached between calls: it can change outside this
//! application's control, so every check re-reads the chain.

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use hyperpool_common::{
    models::token::Token,
    traits::{TransactionRequest, TxStatus, WalletConnector, WalletError},
};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::erc20;

#[derive(Error, Debug)]
pub enum ApprovalError {
    /// The user declined the approval transaction in the wallet.
    #[error("approval rejected by user")]
    UserRejected,

    /// The account cannot cover gas for the approval.
    #[error("insufficient gas funds for approval")]
    InsufficientGas,

    /// The approval transaction was mined but reverted.
    #[error("approval transaction reverted")]
    TransactionReverted,

    /// The allowance is still short after a confirmed approval; either a
    /// race with another spender or a provider that silently reduced the
    /// approved amount.
    #[error("allowance still insufficient after approval")]
    StillInsufficient,

    /// The allowance read returned data that does not decode as a uint256.
    #[error("failed to decode allowance: {0}")]
    AllowanceDecode(String),

    /// Other wallet transport failures.
    #[error("wallet error during approval: {0}")]
    Wallet(#[source] WalletError),
}

impl ApprovalError {
    fn from_wallet(error: WalletError) -> Self {
        match error {
            WalletError::Rejected => ApprovalError::UserRejected,
            WalletError::InsufficientFunds => ApprovalError::InsufficientGas,
            other => ApprovalError::Wallet(other),
        }
    }
}

/// Manages ERC-20 approvals through the wallet collaborator.
pub struct ApprovalManager<W> {
    wallet: Arc<W>,
}

impl<W: WalletConnector> ApprovalManager<W> {
    pub fn new(wallet: Arc<W>) -> Self {
        Self { wallet }
    }

    /// The allowance a swap of `amount` must be covered by: the amount plus
    /// a 1% buffer absorbing rounding and fee drift between quote time and
    /// execution time.
    pub fn required_allowance(amount: U256) -> U256 {
        amount + amount / U256::from(100u64)
    }

    /// Reads the current on-chain allowance for (owner, token, spender).
    ///
    /// Native tokens have no approval concept and short-circuit to an
    /// effectively infinite allowance.
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn check_allowance(
        &self,
        token: &Token,
        spender: Address,
    ) -> Result<U256, ApprovalError> {
        if token.is_native {
            return Ok(U256::MAX);
        }
        let calldata = erc20::encode_allowance(self.wallet.address(), spender);
        let raw = self
            .wallet
            .call(token.address, calldata.into())
            .await
            .map_err(ApprovalError::from_wallet)?;
        let allowance = erc20::decode_allowance(&raw)
            .map_err(|e| ApprovalError::AllowanceDecode(e.to_string()))?;
        debug!(%allowance, %spender, "Read current allowance");
        Ok(allowance)
    }

    /// Whether a swap of `amount` needs an approval first.
    pub async fn needs_approval(
        &self,
        token: &Token,
        amount: U256,
        spender: Address,
    ) -> Result<bool, ApprovalError> {
        if token.is_native {
            return Ok(false);
        }
        let current = self.check_allowance(token, spender).await?;
        Ok(current < Self::required_allowance(amount))
    }

    /// Approves the buffered amount, unless the current allowance already
    /// covers it. Returns whether a transaction was submitted; repeated
    /// calls are safe and cheap.
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn approve_exact(
        &self,
        token: &Token,
        amount: U256,
        spender: Address,
    ) -> Result<bool, ApprovalError> {
        if token.is_native {
            return Ok(false);
        }
        let required = Self::required_allowance(amount);
        let current = self.check_allowance(token, spender).await?;
        if current >= required {
            debug!(%current, %required, "Allowance already covers the buffered amount");
            return Ok(false);
        }
        self.submit_approval(token, spender, required)
            .await?;
        Ok(true)
    }

    /// Approves the maximum representable amount so future swaps of this
    /// token never require re-approval.
    #[instrument(skip(self, token), fields(token = %token.symbol))]
    pub async fn approve_unlimited(
        &self,
        token: &Token,
        spender: Address,
    ) -> Result<bool, ApprovalError> {
        if token.is_native {
            return Ok(false);
        }
        self.submit_approval(token, spender, U256::MAX)
            .await?;
        Ok(true)
    }

    /// Submits the approval transaction and blocks until one confirmation
    /// is observed.
    async fn submit_approval(
        &self,
        token: &Token,
        spender: Address,
        amount: U256,
    ) -> Result<(), ApprovalError> {
        debug!(%spender, %amount, "Submitting approval transaction");
        let request = TransactionRequest {
            to: token.address,
            data: erc20::encode_approve(spender, amount).into(),
            value: U256::ZERO,
            gas: None,
        };
        let tx_hash = self
            .wallet
            .send_transaction(request)
            .await
            .map_err(ApprovalError::from_wallet)?;
        match self
            .wallet
            .wait_for_confirmation(tx_hash)
            .await
            .map_err(ApprovalError::from_wallet)?
        {
            TxStatus::Success => {
                debug!(%tx_hash, "Approval confirmed");
                Ok(())
            }
            TxStatus::Reverted => Err(ApprovalError::TransactionReverted),
        }
    }
}

//! Batched-vs-sequential swap execution.
//!
//! One investment action runs through an explicit state machine:
//! `Idle → Approving → Swapping → {Success | Failed}`. Approval always
//! settles (and is re-verified) before any swap calldata is submitted; a
//! swap against an unapproved token can only revert and waste the user's
//! gas. Nothing in here retries silently: blockchain transactions are not
//! safely idempotent, so every fatal error ends the run and waits for the
//! user to re-initiate.

use std::{collections::HashMap, sync::Arc, time::Duration};

use alloy_primitives::{Address, U256};
use hyperpool_client::{
    quoter::{AggregatedQuote, PoolQuoter},
    rpc::{QuoteClient, QuoteError},
};
use hyperpool_common::{
    dto::ExecutableQuote,
    models::{
        investment::InvestmentRecord, pool::PoolDefinition, token::Token, ChainSettings, TxHash,
    },
    traits::{LedgerStore, TransactionRequest, WalletConnector, WalletError},
};
use thiserror::Error;
use tokio::{sync::watch, time::sleep};
use tracing::{debug, error, instrument, warn};

use crate::{approval::ApprovalError, multicall, ApprovalManager};

/// Wait between sequential submissions so the wallet's pending-transaction
/// handling is not overwhelmed.
const DEFAULT_LEG_DELAY: Duration = Duration::from_secs(1);

/// How the input-token approval is requested when one is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalMode {
    /// Approve the swap amount plus buffer.
    #[default]
    Exact,
    /// Approve the maximum representable amount once.
    Unlimited,
}

/// Phases of one investment action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionPhase {
    #[default]
    Idle,
    Approving,
    Swapping,
    Success,
    Failed,
}

/// Events driving the phase transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionEvent {
    Confirmed,
    ApprovalSettled,
    LegsSubmitted,
    Fault,
}

/// Pure transition function of the execution state machine. Side effects
/// happen around it in the controller; illegal transitions degrade to
/// `Failed`.
pub fn advance(phase: ExecutionPhase, event: ExecutionEvent) -> ExecutionPhase {
    match (phase, event) {
        (ExecutionPhase::Idle, ExecutionEvent::Confirmed) => ExecutionPhase::Approving,
        (ExecutionPhase::Approving, ExecutionEvent::ApprovalSettled) => ExecutionPhase::Swapping,
        (ExecutionPhase::Swapping, ExecutionEvent::LegsSubmitted) => ExecutionPhase::Success,
        _ => ExecutionPhase::Failed,
    }
}

#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The pool references a token missing from the registry.
    #[error("unknown token: {0}")]
    UnknownToken(String),

    #[error("approval failed: {0}")]
    Approval(#[from] ApprovalError),

    #[error("failed to fetch executable quotes: {0}")]
    Quote(#[from] QuoteError),

    /// The batched submission failed at the client level. This is fatal:
    /// the batch may still have been accepted asynchronously, and
    /// re-submitting the legs sequentially risks double execution.
    #[error("batched submission failed: {source}")]
    Batch {
        #[source]
        source: WalletError,
    },

    /// A sequential leg failed. Remaining legs were not attempted; the
    /// transaction ids of legs that did succeed are retained so the caller
    /// can report the partial pool entry.
    #[error("swap leg {index} failed after {count} submitted: {source}", count = .submitted.len())]
    Leg {
        index: usize,
        submitted: Vec<TxHash>,
        #[source]
        source: WalletError,
    },
}

/// Result of a completed investment: the ordered transaction ids, one per
/// leg in sequential mode or a single id for a batched submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub tx_hashes: Vec<TxHash>,
}

/// Drives one investment from confirmation to submitted transactions.
pub struct ExecutionController<C, W, L> {
    quoter: PoolQuoter<C>,
    wallet: Arc<W>,
    approvals: ApprovalManager<W>,
    ledger: Arc<L>,
    settings: ChainSettings,
    leg_delay: Duration,
    phase_tx: watch::Sender<ExecutionPhase>,
}

impl<C, W, L> ExecutionController<C, W, L>
where
    C: QuoteClient,
    W: WalletConnector,
    L: LedgerStore,
{
    pub fn new(
        quoter: PoolQuoter<C>,
        wallet: Arc<W>,
        ledger: Arc<L>,
        settings: ChainSettings,
    ) -> Self {
        let (phase_tx, _) = watch::channel(ExecutionPhase::Idle);
        Self {
            quoter,
            approvals: ApprovalManager::new(wallet.clone()),
            wallet,
            ledger,
            settings,
            leg_delay: DEFAULT_LEG_DELAY,
            phase_tx,
        }
    }

    pub fn with_leg_delay(mut self, leg_delay: Duration) -> Self {
        self.leg_delay = leg_delay;
        self
    }

    /// Observe phase changes of the current investment.
    pub fn phase(&self) -> watch::Receiver<ExecutionPhase> {
        self.phase_tx.subscribe()
    }

    fn transition(&self, event: ExecutionEvent) {
        self.phase_tx
            .send_modify(|phase| *phase = advance(*phase, event));
    }

    /// Executes the investment the user confirmed.
    ///
    /// `quote` is the aggregated indicative quote that was displayed; its
    /// allocations, slippage and allowance targets drive the run.
    #[instrument(skip(self, pool, quote), fields(pool = %pool.id))]
    pub async fn invest(
        &self,
        pool: &PoolDefinition,
        quote: &AggregatedQuote,
        mode: ApprovalMode,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        // Reset in case a previous run left the channel on a terminal phase.
        self.phase_tx
            .send_replace(ExecutionPhase::Idle);
        let result = self.run(pool, quote, mode).await;
        if result.is_err() {
            self.transition(ExecutionEvent::Fault);
        }
        result
    }

    async fn run(
        &self,
        pool: &PoolDefinition,
        quote: &AggregatedQuote,
        mode: ApprovalMode,
    ) -> Result<ExecutionOutcome, ExecutionError> {
        let input = self
            .quoter
            .tokens()
            .by_symbol(&pool.input_token)
            .ok_or_else(|| ExecutionError::UnknownToken(pool.input_token.clone()))?
            .clone();

        self.transition(ExecutionEvent::Confirmed);
        if !input.is_native {
            let targets = indicative_allowance_targets(quote);
            self.settle_approvals(&input, &targets, mode)
                .await?;
        }

        let legs = self
            .quoter
            .execution_quotes(
                pool,
                quote.total_amount,
                self.wallet.address(),
                Some(quote.allocations.clone()),
                quote.slippage,
            )
            .await?;

        // The provider can change routing contracts between the indicative
        // quote and the executable one; a target the user never approved
        // must surface here, not as a reverted swap.
        if !input.is_native {
            for (spender, amount) in executable_allowance_targets(&legs) {
                if self
                    .approvals
                    .needs_approval(&input, amount, spender)
                    .await?
                {
                    warn!(%spender, "Executable quote routed through an unapproved target");
                    return Err(ApprovalError::StillInsufficient.into());
                }
            }
        }
        self.transition(ExecutionEvent::ApprovalSettled);

        let tx_hashes = match self.settings.multicall3 {
            Some(multicall) if legs.len() > 1 => self.submit_batched(&legs, multicall).await?,
            _ => self.submit_sequential(&legs).await?,
        };
        self.transition(ExecutionEvent::LegsSubmitted);

        if let Some(first_tx) = tx_hashes.first() {
            let record = InvestmentRecord::new(pool.id.clone(), quote.total_amount, *first_tx);
            if let Err(e) = self
                .ledger
                .record(self.wallet.address(), record)
            {
                // The funds already moved; a ledger write failure must not
                // turn the investment into an error.
                warn!(error = %e, "Failed to record investment");
            }
        }
        Ok(ExecutionOutcome { tx_hashes })
    }

    /// Runs the approval flow for every allowance target, re-checking each
    /// one after its approval confirmed. Only the confirmed on-chain state
    /// counts; an optimistic submission is not trusted.
    async fn settle_approvals(
        &self,
        input: &Token,
        targets: &[(Address, U256)],
        mode: ApprovalMode,
    ) -> Result<(), ExecutionError> {
        for &(spender, amount) in targets {
            if !self
                .approvals
                .needs_approval(input, amount, spender)
                .await?
            {
                continue;
            }
            debug!(%spender, %amount, "Requesting approval");
            match mode {
                ApprovalMode::Exact => {
                    self.approvals
                        .approve_exact(input, amount, spender)
                        .await?
                }
                ApprovalMode::Unlimited => {
                    self.approvals
                        .approve_unlimited(input, spender)
                        .await?
                }
            };
            if self
                .approvals
                .needs_approval(input, amount, spender)
                .await?
            {
                return Err(ApprovalError::StillInsufficient.into());
            }
        }
        Ok(())
    }

    /// Submits all legs as one atomic Multicall3 transaction.
    async fn submit_batched(
        &self,
        legs: &[ExecutableQuote],
        multicall: Address,
    ) -> Result<Vec<TxHash>, ExecutionError> {
        let request = multicall::combine_execution_quotes(legs, multicall);
        debug!(legs = legs.len(), to = %request.to, "Submitting batched swap");
        let tx_hash = self
            .wallet
            .send_transaction(request)
            .await
            .map_err(|source| {
                error!(error = %source, "Batched submission failed");
                ExecutionError::Batch { source }
            })?;
        Ok(vec![tx_hash])
    }

    /// Submits the legs one by one, in pool output order, stopping on the
    /// first failure.
    async fn submit_sequential(
        &self,
        legs: &[ExecutableQuote],
    ) -> Result<Vec<TxHash>, ExecutionError> {
        let mut submitted = Vec::with_capacity(legs.len());
        for (index, leg) in legs.iter().enumerate() {
            debug!(index, to = %leg.to, "Submitting swap leg");
            match self
                .wallet
                .send_transaction(leg_transaction(leg))
                .await
            {
                Ok(tx_hash) => submitted.push(tx_hash),
                Err(source) => {
                    error!(index, error = %source, "Swap leg failed; aborting remaining legs");
                    return Err(ExecutionError::Leg { index, submitted, source });
                }
            }
            if index + 1 < legs.len() {
                sleep(self.leg_delay).await;
            }
        }
        Ok(submitted)
    }
}

/// Allowance targets carried by the indicative quote, with the summed sell
/// amount routed through each.
fn indicative_allowance_targets(quote: &AggregatedQuote) -> Vec<(Address, U256)> {
    sum_by_target(
        quote
            .legs
            .iter()
            .map(|leg| (leg.quote.allowance_target, leg.quote.sell_amount())),
    )
}

/// Same, for the freshly fetched executable quotes.
fn executable_allowance_targets(legs: &[ExecutableQuote]) -> Vec<(Address, U256)> {
    sum_by_target(
        legs.iter()
            .map(|leg| (leg.price.allowance_target, leg.price.sell_amount())),
    )
}

fn sum_by_target(pairs: impl Iterator<Item = (Address, U256)>) -> Vec<(Address, U256)> {
    let mut by_target: HashMap<Address, U256> = HashMap::new();
    let mut order = Vec::new();
    for (target, amount) in pairs {
        let entry = by_target.entry(target).or_insert_with(|| {
            order.push(target);
            U256::ZERO
        });
        *entry += amount;
    }
    order
        .into_iter()
        .map(|target| (target, by_target[&target]))
        .collect()
}

/// Builds the wallet transaction for one sequential leg, padding the quoted
/// gas by 20% to absorb estimation drift.
fn leg_transaction(leg: &ExecutableQuote) -> TransactionRequest {
    let gas = leg.price.gas_estimate() * U256::from(12u64) / U256::from(10u64);
    TransactionRequest {
        to: leg.to,
        data: leg.data.clone(),
        value: leg.price.native_value(),
        gas: Some(gas),
    }
}

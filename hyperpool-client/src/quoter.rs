//! Pool swap aggregation: fans one input amount out into per-leg quote
//! requests and folds the responses into a single multi-leg quote.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use alloy_primitives::{Address, U256};
use futures03::future::try_join_all;
use hyperpool_common::{
    conv,
    dto::{ExecutableQuote, PriceQuote, QuoteRequestBody},
    models::{
        pool::{AllocationSet, PoolDefinition, PoolId},
        token::{Token, TokenRegistry},
    },
};
use tracing::{debug, instrument};

use crate::rpc::{QuoteClient, QuoteError};

/// One quote provider response for one output token, with the slippage
/// bound already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LegQuote {
    pub output_token: String,
    pub quote: PriceQuote,
    /// `buy_amount - floor(buy_amount * slippage)`.
    pub min_output: U256,
}

/// An aggregated multi-leg quote for entering a pool.
///
/// Leg order matches the pool's configured output-token order end to end;
/// consumers correlate legs positionally. Instances are created fresh per
/// request and replaced wholesale, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedQuote {
    pub pool_id: PoolId,
    pub input_token: String,
    pub total_amount: f64,
    pub allocations: AllocationSet,
    pub slippage: f64,
    pub legs: Vec<LegQuote>,
    /// Worst price impact across legs.
    pub max_price_impact: f64,
    /// Summed per-leg gas estimates.
    pub total_gas: U256,
}

impl AggregatedQuote {
    pub fn min_output_amounts(&self) -> Vec<U256> {
        self.legs
            .iter()
            .map(|leg| leg.min_output)
            .collect()
    }

    pub fn output_amounts(&self) -> Vec<U256> {
        self.legs
            .iter()
            .map(|leg| leg.quote.buy_amount())
            .collect()
    }
}

/// Subtracts the slippage tolerance from a quoted buy amount, in basis
/// points and flooring, so the result can be used as an on-chain minimum.
pub fn min_output_after_slippage(buy_amount: U256, slippage: f64) -> U256 {
    let bps = (slippage * 10_000.0)
        .floor()
        .clamp(0.0, 10_000.0) as u64;
    buy_amount - buy_amount * U256::from(bps) / U256::from(10_000u64)
}

/// Fan-out/fan-in aggregator over a [`QuoteClient`].
///
/// Tracks a request generation so that a quote superseded by a newer
/// request is discarded instead of being applied out of order.
pub struct PoolQuoter<C> {
    client: Arc<C>,
    tokens: TokenRegistry,
    generation: AtomicU64,
}

impl<C: QuoteClient> PoolQuoter<C> {
    pub fn new(client: Arc<C>, tokens: TokenRegistry) -> Self {
        Self { client, tokens, generation: AtomicU64::new(0) }
    }

    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    fn resolve_token(&self, symbol: &str) -> Result<&Token, QuoteError> {
        self.tokens
            .by_symbol(symbol)
            .ok_or_else(|| QuoteError::InvalidToken(symbol.to_string()))
    }

    /// Builds the per-leg request bodies in pool output order.
    fn leg_requests(
        &self,
        pool: &PoolDefinition,
        total_amount: f64,
        allocations: &AllocationSet,
        slippage: f64,
        taker: Option<Address>,
    ) -> Result<Vec<QuoteRequestBody>, QuoteError> {
        let input = self.resolve_token(&pool.input_token)?;
        let leg_amounts = allocations.leg_amounts(total_amount);

        pool.output_tokens
            .iter()
            .zip(leg_amounts)
            .map(|(output_symbol, leg_amount)| {
                let output = self.resolve_token(output_symbol)?;
                Ok(QuoteRequestBody::new(
                    input.address,
                    output.address,
                    conv::to_base_units(leg_amount, input.decimals),
                    slippage,
                    taker,
                ))
            })
            .collect()
    }

    /// Fetches an aggregated indicative quote for entering `pool` with
    /// `total_amount` of the input token.
    ///
    /// All legs are requested concurrently; any leg failure fails the whole
    /// aggregation, so callers never see a partial quote.
    #[instrument(skip(self, pool), fields(pool = %pool.id))]
    pub async fn pool_quote(
        &self,
        pool: &PoolDefinition,
        total_amount: f64,
        allocations: Option<AllocationSet>,
        slippage: f64,
        taker: Option<Address>,
    ) -> Result<AggregatedQuote, QuoteError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let allocations = pool.resolve_allocations(allocations)?;
        let requests = self.leg_requests(pool, total_amount, &allocations, slippage, taker)?;

        let mut tasks = Vec::with_capacity(requests.len());
        for request in &requests {
            let client = self.client.clone();
            tasks.push(async move { client.price_quote(request).await });
        }
        let quotes = try_join_all(tasks).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded pool quote");
            return Err(QuoteError::Superseded);
        }

        let legs: Vec<LegQuote> = pool
            .output_tokens
            .iter()
            .zip(quotes)
            .map(|(output_token, quote)| LegQuote {
                output_token: output_token.clone(),
                min_output: min_output_after_slippage(quote.buy_amount(), slippage),
                quote,
            })
            .collect();

        let max_price_impact = legs
            .iter()
            .map(|leg| leg.quote.price_impact())
            .fold(0.0, f64::max);
        let total_gas = legs
            .iter()
            .fold(U256::ZERO, |sum, leg| sum + leg.quote.gas_estimate());

        debug!(
            legs = legs.len(),
            max_price_impact,
            %total_gas,
            "Aggregated pool quote"
        );
        Ok(AggregatedQuote {
            pool_id: pool.id.clone(),
            input_token: pool.input_token.clone(),
            total_amount,
            allocations,
            slippage,
            legs,
            max_price_impact,
            total_gas,
        })
    }

    /// Fetches execution-grade quotes for every leg, in pool output order.
    ///
    /// Each leg keeps its own calldata; the execution controller decides
    /// whether they are batched or submitted one by one.
    #[instrument(skip(self, pool), fields(pool = %pool.id))]
    pub async fn execution_quotes(
        &self,
        pool: &PoolDefinition,
        total_amount: f64,
        taker: Address,
        allocations: Option<AllocationSet>,
        slippage: f64,
    ) -> Result<Vec<ExecutableQuote>, QuoteError> {
        let allocations = pool.resolve_allocations(allocations)?;
        let requests =
            self.leg_requests(pool, total_amount, &allocations, slippage, Some(taker))?;

        let mut tasks = Vec::with_capacity(requests.len());
        for request in &requests {
            let client = self.client.clone();
            tasks.push(async move { client.swap_quote(request).await });
        }
        try_join_all(tasks).await
    }
}

use std::{path::PathBuf, sync::Arc};

use alloy_primitives::Address;
use anyhow::Context;
use clap::Parser;
use hyperpool_common::{config::AppConfig, conv, models::pool::AllocationSet};
use tracing_subscriber::EnvFilter;

use crate::{
    quoter::PoolQuoter,
    rpc::{HttpQuoteClient, HttpQuoteClientOptions},
};

/// Hyperpool Client CLI - fetches an aggregated swap quote for a pool
///
/// Loads the pool/token configuration, requests one quote per output token
/// from the swap-quote provider and prints the aggregated result.
#[derive(Parser, Debug, Clone)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
struct CliArgs {
    /// Quote provider base URL.
    #[clap(long, default_value = "https://api.hyperbloom.xyz", env = "HYPERPOOL_API_URL")]
    api_url: String,

    /// Quote provider API key. Can be set with the HYPERPOOL_API_KEY env
    /// variable.
    #[clap(short = 'k', long, env = "HYPERPOOL_API_KEY")]
    api_key: Option<String>,

    /// Path to a configuration document. Defaults to the bundled HyperEVM
    /// configuration.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Pool id to quote, e.g. usdc-hype-usdt.
    #[clap(short = 'p', long)]
    pool: String,

    /// Input amount in human units of the pool's input token.
    #[clap(short = 'a', long)]
    amount: f64,

    /// Optional allocation override as comma-separated percentages,
    /// e.g. "60,40". Must sum to 100.
    #[clap(long)]
    ratios: Option<String>,

    /// Slippage tolerance as a fraction, e.g. 0.005 for 0.5%.
    #[clap(long, default_value = "0.005")]
    slippage: f64,

    /// Optional taker address forwarded to the provider.
    #[clap(long)]
    taker: Option<Address>,
}

fn parse_ratios(raw: &str) -> anyhow::Result<AllocationSet> {
    let percentages = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .with_context(|| format!("invalid ratio entry: {part}"))
        })
        .collect::<anyhow::Result<Vec<f64>>>()?;
    Ok(AllocationSet::new(percentages))
}

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = CliArgs::parse();
    let config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AppConfig::hyperevm(),
    };
    let (tokens, pools, _settings) = config.build()?;

    let pool = pools
        .by_str(&args.pool)
        .with_context(|| {
            let known = pools
                .ids()
                .iter()
                .map(|id| id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!("unknown pool {}. Available: {known}", args.pool)
        })?
        .clone();

    let allocations = args
        .ratios
        .as_deref()
        .map(parse_ratios)
        .transpose()?;

    let client = HttpQuoteClient::new(
        &args.api_url,
        HttpQuoteClientOptions::new().with_api_key(args.api_key.clone()),
    )?;
    let quoter = PoolQuoter::new(Arc::new(client), tokens.clone());

    let quote = quoter
        .pool_quote(&pool, args.amount, allocations, args.slippage, args.taker)
        .await?;

    println!(
        "pool {}: {} {} in, {} legs",
        quote.pool_id,
        quote.total_amount,
        quote.input_token,
        quote.legs.len()
    );
    for leg in &quote.legs {
        let decimals = tokens
            .by_symbol(&leg.output_token)
            .map(|token| token.decimals)
            .unwrap_or(18);
        println!(
            "  {:>8}: out {} (min {}), impact {}%",
            leg.output_token,
            conv::format_units(leg.quote.buy_amount(), decimals),
            conv::format_units(leg.min_output, decimals),
            leg.quote.price_impact() * 100.0,
        );
    }
    println!(
        "max price impact {}%, total gas {}",
        quote.max_price_impact * 100.0,
        quote.total_gas
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ratios() {
        let set = parse_ratios("60, 40").unwrap();
        assert_eq!(set.percentages(), &[60.0, 40.0]);
        assert!(parse_ratios("60,forty").is_err());
    }
}

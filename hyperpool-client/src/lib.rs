//! Client for the swap-quote provider API and the pool swap aggregator.

pub mod cli;
pub mod quoter;
pub mod rpc;

pub use quoter::{AggregatedQuote, LegQuote, PoolQuoter};
pub use rpc::{HttpQuoteClient, HttpQuoteClientOptions, QuoteClient, QuoteError};

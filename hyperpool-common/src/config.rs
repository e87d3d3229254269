//! Application configuration: supported tokens, pool recipes and chain
//! contracts, loaded once at startup and validated into the runtime
//! registries.

use std::{collections::HashMap, path::Path};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{
    pool::{AllocationError, AllocationSet, PoolDefinition, PoolId, PoolRegistry},
    token::{Token, TokenRegistry},
    ChainSettings,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A pool references a token that is not in the token table.
    #[error("pool {pool} references unknown token {symbol}")]
    UnknownToken { pool: String, symbol: String },

    #[error("pool {pool} has invalid default allocations: {source}")]
    InvalidAllocations {
        pool: String,
        #[source]
        source: AllocationError,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenConfig {
    pub address: Address,
    pub decimals: u32,
    #[serde(default)]
    pub is_native: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    pub id: String,
    pub input_token: String,
    pub output_tokens: Vec<String>,
    pub default_ratio: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractsConfig {
    #[serde(default)]
    pub multicall3: Option<Address>,
}

/// The whole configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub chain_id: u64,
    pub tokens: HashMap<String, TokenConfig>,
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub contracts: ContractsConfig,
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// The HyperEVM deployment this application ships against.
    pub fn hyperevm() -> Self {
        let raw = include_str!("../config/hyperevm.json");
        Self::from_json_str(raw).expect("bundled hyperevm config is valid")
    }

    /// Validates the document and builds the runtime registries.
    pub fn build(self) -> Result<(TokenRegistry, PoolRegistry, ChainSettings), ConfigError> {
        let tokens = TokenRegistry::new(self.tokens.iter().map(|(symbol, token)| {
            Token::new(token.address, symbol, token.decimals, token.is_native)
        }));

        let mut pools = Vec::with_capacity(self.pools.len());
        for pool in &self.pools {
            for symbol in std::iter::once(&pool.input_token).chain(pool.output_tokens.iter()) {
                if !tokens.contains(symbol) {
                    return Err(ConfigError::UnknownToken {
                        pool: pool.id.clone(),
                        symbol: symbol.clone(),
                    });
                }
            }
            let definition = PoolDefinition {
                id: PoolId::new(&pool.id),
                input_token: pool.input_token.clone(),
                output_tokens: pool.output_tokens.clone(),
                default_allocations: AllocationSet::new(pool.default_ratio.clone()),
            };
            definition
                .resolve_allocations(None)
                .map_err(|source| ConfigError::InvalidAllocations {
                    pool: pool.id.clone(),
                    source,
                })?;
            pools.push(definition);
        }

        let settings =
            ChainSettings { chain_id: self.chain_id, multicall3: self.contracts.multicall3 };
        Ok((tokens, PoolRegistry::new(pools), settings))
    }
}

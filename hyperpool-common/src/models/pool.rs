//! Pool configuration and allocation math.
//!
//! A pool is a static recipe: one input token swapped into N output tokens
//! according to percentage allocations. Pools are loaded from configuration
//! at startup and never mutated at runtime.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How far the allocation sum may drift from 100 before it is rejected.
pub const ALLOCATION_SUM_TOLERANCE: f64 = 0.01;

#[derive(Error, Debug, PartialEq)]
pub enum AllocationError {
    /// The percentages do not add up to 100 within tolerance.
    #[error("allocations must sum to 100, got {sum}")]
    SumMismatch { sum: f64 },

    /// A percentage entry is below zero.
    #[error("allocation {index} is negative: {value}")]
    NegativeValue { index: usize, value: f64 },

    /// The number of entries does not match the pool's output count.
    #[error("expected {expected} allocations, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// An ordered sequence of percentage allocations, one per pool output token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllocationSet(Vec<f64>);

impl AllocationSet {
    pub fn new(percentages: Vec<f64>) -> Self {
        Self(percentages)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn percentages(&self) -> &[f64] {
        &self.0
    }

    /// Checks the sum-to-100 and non-negativity invariants.
    pub fn validate(&self) -> Result<(), AllocationError> {
        for (index, &value) in self.0.iter().enumerate() {
            if value < 0.0 {
                return Err(AllocationError::NegativeValue { index, value });
            }
        }
        let sum: f64 = self.0.iter().sum();
        if (sum - 100.0).abs() > ALLOCATION_SUM_TOLERANCE {
            return Err(AllocationError::SumMismatch { sum });
        }
        Ok(())
    }

    /// Splits `total` proportionally across the allocations.
    ///
    /// The outputs sum back to `total` up to floating rounding and are never
    /// negative for non-negative inputs.
    pub fn leg_amounts(&self, total: f64) -> Vec<f64> {
        self.0
            .iter()
            .map(|percentage| total * percentage / 100.0)
            .collect()
    }
}

/// Canonical pool identifier, normalized exactly once on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(String);

impl PoolId {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static pool definition: input token, ordered output tokens and the
/// default split between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDefinition {
    pub id: PoolId,
    pub input_token: String,
    pub output_tokens: Vec<String>,
    pub default_allocations: AllocationSet,
}

impl PoolDefinition {
    /// Picks the caller-supplied allocations or falls back to the pool
    /// default, checking both invariants and the output-count match.
    pub fn resolve_allocations(
        &self,
        override_allocations: Option<AllocationSet>,
    ) -> Result<AllocationSet, AllocationError> {
        let allocations =
            override_allocations.unwrap_or_else(|| self.default_allocations.clone());
        if allocations.len() != self.output_tokens.len() {
            return Err(AllocationError::LengthMismatch {
                expected: self.output_tokens.len(),
                actual: allocations.len(),
            });
        }
        allocations.validate()?;
        Ok(allocations)
    }
}

/// All configured pools, keyed by canonical id.
#[derive(Debug, Clone, Default)]
pub struct PoolRegistry {
    pools: HashMap<PoolId, PoolDefinition>,
}

impl PoolRegistry {
    pub fn new(pools: impl IntoIterator<Item = PoolDefinition>) -> Self {
        Self {
            pools: pools
                .into_iter()
                .map(|pool| (pool.id.clone(), pool))
                .collect(),
        }
    }

    pub fn get(&self, id: &PoolId) -> Option<&PoolDefinition> {
        self.pools.get(id)
    }

    /// Resolves a raw user-facing id string. The string is canonicalized
    /// once and looked up exactly; there are no alternative key spellings.
    pub fn by_str(&self, raw: &str) -> Option<&PoolDefinition> {
        self.pools.get(&PoolId::new(raw))
    }

    pub fn ids(&self) -> Vec<&PoolId> {
        let mut ids: Vec<&PoolId> = self.pools.keys().collect();
        ids.sort_unstable_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}

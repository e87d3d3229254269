//! Shared models, wire types and helpers used within the Hyperpool system.

pub mod config;
pub mod conv;
pub mod dto;
pub mod models;
pub mod traits;

pub use alloy_primitives::{Address, Bytes, B256, U256};

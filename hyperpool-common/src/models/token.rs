use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u32,
    /// Native gas tokens have no allowance concept; approvals short-circuit.
    pub is_native: bool,
}

impl Token {
    pub fn new(address: Address, symbol: &str, decimals: u32, is_native: bool) -> Self {
        Self { address, symbol: symbol.to_string(), decimals, is_native }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

/// The set of tokens the application supports, built once at configuration
/// load time.
///
/// Lookups are exact, either by symbol or by address. There is no fuzzy or
/// case-normalizing resolution at runtime; anything that is not in the
/// registry is simply not a supported token.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    by_symbol: HashMap<String, Token>,
    by_address: HashMap<Address, String>,
}

impl TokenRegistry {
    pub fn new(tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut registry = Self::default();
        for token in tokens {
            registry
                .by_address
                .insert(token.address, token.symbol.clone());
            registry
                .by_symbol
                .insert(token.symbol.clone(), token);
        }
        registry
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&Token> {
        self.by_symbol.get(symbol)
    }

    pub fn by_address(&self, address: &Address) -> Option<&Token> {
        self.by_address
            .get(address)
            .and_then(|symbol| self.by_symbol.get(symbol))
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    /// Symbols in the registry, for error messages listing what is supported.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self
            .by_symbol
            .keys()
            .map(String::as_str)
            .collect();
        symbols.sort_unstable();
        symbols
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn usdc() -> Token {
        Token::new(
            Address::from_str("0xb88339CB7199b77E23DB6E890353E22632Ba630f").unwrap(),
            "USDC",
            6,
            false,
        )
    }

    #[test]
    fn test_constructor() {
        let token = usdc();

        assert_eq!(token.symbol, "USDC");
        assert_eq!(token.decimals, 6);
        assert!(!token.is_native);
    }

    #[test]
    fn test_registry_lookup() {
        let registry = TokenRegistry::new([
            usdc(),
            Token::new(
                Address::from_str("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee").unwrap(),
                "HYPE",
                18,
                true,
            ),
        ]);

        assert_eq!(
            registry
                .by_symbol("USDC")
                .map(|t| t.decimals),
            Some(6)
        );
        assert_eq!(
            registry
                .by_address(&usdc().address)
                .map(|t| t.symbol.as_str()),
            Some("USDC")
        );
        assert!(registry.by_symbol("usdc").is_none());
        assert!(registry.by_symbol("WETH").is_none());
        assert_eq!(registry.symbols(), vec!["HYPE", "USDC"]);
    }
}

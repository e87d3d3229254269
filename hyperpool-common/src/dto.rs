//! Wire types for the swap-quote provider API.
//!
//! Amounts travel as base-unit integer strings and addresses as checksummed
//! hex strings. Fields the upstream is known to emit unreliably (`gas`,
//! `value`, `gasPrice`, `estimatedPriceImpact`) are kept as raw JSON values
//! and read through the accessors below, so a junk field degrades to a
//! fallback instead of failing the whole response.

use alloy_primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conv;

/// Gas limit assumed for a swap leg whose quote carried no usable estimate.
pub const DEFAULT_LEG_GAS: u64 = 300_000;

/// Request body shared by the price and quote endpoints. The quote endpoint
/// additionally requires `takerAddress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequestBody {
    pub sell_token: String,
    pub buy_token: String,
    pub sell_amount: String,
    pub slippage_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taker_address: Option<String>,
}

impl QuoteRequestBody {
    pub fn new(
        sell_token: Address,
        buy_token: Address,
        sell_amount: U256,
        slippage_percentage: f64,
        taker_address: Option<Address>,
    ) -> Self {
        Self {
            sell_token: sell_token.to_checksum(None),
            buy_token: buy_token.to_checksum(None),
            sell_amount: sell_amount.to_string(),
            slippage_percentage,
            taker_address: taker_address.map(|address| address.to_checksum(None)),
        }
    }
}

/// Indicative price quote: read-only, no calldata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    #[serde(default)]
    pub chain_id: u64,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub estimated_price_impact: Value,
    #[serde(default)]
    pub value: Value,
    #[serde(default)]
    pub gas: Value,
    #[serde(default)]
    pub gas_price: Value,
    pub buy_token_address: Address,
    pub buy_amount: String,
    pub sell_token_address: Address,
    pub sell_amount: String,
    /// The contract that must be approved to spend the sell token. Used
    /// verbatim as the approval spender; the provider can change routing
    /// contracts between requests.
    pub allowance_target: Address,
}

impl PriceQuote {
    pub fn buy_amount(&self) -> U256 {
        conv::exact_amount_str(&self.buy_amount, U256::ZERO)
    }

    pub fn sell_amount(&self) -> U256 {
        conv::exact_amount_str(&self.sell_amount, U256::ZERO)
    }

    pub fn gas_estimate(&self) -> U256 {
        conv::exact_amount(&self.gas, U256::from(DEFAULT_LEG_GAS))
    }

    pub fn gas_price(&self) -> Option<U256> {
        match &self.gas_price {
            Value::Null => None,
            value => Some(conv::exact_amount(value, U256::ZERO)),
        }
    }

    pub fn native_value(&self) -> U256 {
        conv::exact_amount(&self.value, U256::ZERO)
    }

    pub fn price_impact(&self) -> f64 {
        conv::safe_float(&self.estimated_price_impact, 0.0)
    }
}

/// Executable quote: a price quote extended with the destination contract
/// and calldata needed to submit the swap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutableQuote {
    #[serde(flatten)]
    pub price: PriceQuote,
    pub to: Address,
    pub data: Bytes,
    #[serde(default)]
    pub guaranteed_price: String,
}

/// One supported token as listed by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenListing {
    pub symbol: String,
    pub address: Address,
    pub decimals: u32,
    #[serde(default)]
    pub is_native: bool,
}

/// Liquidity sources and supported tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesResponse {
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub tokens: Vec<TokenListing>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn price_quote_json() -> Value {
        json!({
            "chainId": 999,
            "price": "2.5",
            "estimatedPriceImpact": "0.02",
            "value": "0",
            "gasPrice": "47500000",
            "gas": "200000",
            "buyTokenAddress": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
            "buyAmount": "40000000000000000000",
            "sellTokenAddress": "0xb88339cb7199b77e23db6e890353e22632ba630f",
            "sellAmount": "50000000",
            "allowanceTarget": "0x4212a77e4533eca49643d7b731f5fb1b2782fe94"
        })
    }

    #[test]
    fn test_price_quote_deserializes() {
        let quote: PriceQuote = serde_json::from_value(price_quote_json()).unwrap();

        assert_eq!(quote.chain_id, 999);
        assert_eq!(quote.buy_amount(), U256::from(40_000_000_000_000_000_000u128));
        assert_eq!(quote.sell_amount(), U256::from(50_000_000u64));
        assert_eq!(quote.gas_estimate(), U256::from(200_000u64));
        assert_eq!(quote.price_impact(), 0.02);
        assert_eq!(quote.native_value(), U256::ZERO);
    }

    #[test]
    fn test_price_quote_survives_junk_fields() {
        let mut body = price_quote_json();
        body["gas"] = json!(null);
        body["estimatedPriceImpact"] = json!("NaN");
        body["gasPrice"] = json!(null);

        let quote: PriceQuote = serde_json::from_value(body).unwrap();

        assert_eq!(quote.gas_estimate(), U256::from(DEFAULT_LEG_GAS));
        assert_eq!(quote.price_impact(), 0.0);
        assert_eq!(quote.gas_price(), None);
    }

    #[test]
    fn test_executable_quote_flattens_price_fields() {
        let mut body = price_quote_json();
        body["to"] = json!("0x4212a77e4533eca49643d7b731f5fb1b2782fe94");
        body["data"] = json!("0xdeadbeef");
        body["guaranteedPrice"] = json!("2.45");

        let quote: ExecutableQuote = serde_json::from_value(body).unwrap();

        assert_eq!(quote.price.buy_amount(), U256::from(40_000_000_000_000_000_000u128));
        assert_eq!(quote.data, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(quote.guaranteed_price, "2.45");
    }

    #[test]
    fn test_request_body_serializes_checksummed() {
        let body = QuoteRequestBody::new(
            "0xb88339cb7199b77e23db6e890353e22632ba630f"
                .parse()
                .unwrap(),
            "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
                .parse()
                .unwrap(),
            U256::from(50_000_000u64),
            0.005,
            None,
        );

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["sellToken"], "0xb88339CB7199b77E23DB6E890353E22632Ba630f");
        assert_eq!(json["sellAmount"], "50000000");
        assert_eq!(json["slippagePercentage"], 0.005);
        assert!(json.get("takerAddress").is_none());
    }
}

//! # Swap-Quote Provider Client
//!
//! HTTP access to the external swap-quote provider: indicative price
//! lookups, executable (calldata-bearing) quotes and the supported-sources
//! listing. Transport and upstream failures are normalized into
//! [`QuoteError`] at this boundary; nothing above it sees a raw
//! `reqwest::Error`.

use async_trait::async_trait;
use hyperpool_common::{
    dto::{ExecutableQuote, PriceQuote, QuoteRequestBody, SourcesResponse},
    models::pool::AllocationError,
};
use reqwest::{header, Client, ClientBuilder, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument, trace};

#[derive(Error, Debug)]
pub enum QuoteError {
    /// The passed provider url failed to parse.
    #[error("Failed to parse URL: {0}. Error: {1}")]
    UrlParsing(String, String),

    /// The request data is not correctly formed.
    #[error("Failed to format request: {0}")]
    FormatRequest(String),

    /// A token identifier is not in the supported set.
    #[error("Unsupported token: {0}")]
    InvalidToken(String),

    /// The allocations attached to a pool quote request are invalid.
    #[error("Invalid allocations: {0}")]
    Allocation(#[from] AllocationError),

    /// The provider answered with a non-2xx status. The response body is
    /// carried as structured detail, not discarded.
    #[error("Quote provider returned status {status}: {details}")]
    UpstreamHttp { status: u16, details: Value },

    /// Errors forwarded from the HTTP transport.
    #[error("Quote provider unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// The response from the provider could not be parsed correctly.
    #[error("Failed to parse response: {0}")]
    ParseResponse(String),

    /// A newer quote request was issued while this one was in flight; the
    /// result must be discarded.
    #[error("Quote superseded by a newer request")]
    Superseded,
}

/// Abstraction over the quote provider. Holds no state beyond the
/// connection pool; every call re-reads the upstream.
#[cfg_attr(any(test, feature = "test-utils"), mockall::automock)]
#[async_trait]
pub trait QuoteClient: Send + Sync {
    /// Read-only price lookup for one token pair and amount; no calldata.
    async fn price_quote(&self, request: &QuoteRequestBody) -> Result<PriceQuote, QuoteError>;

    /// Execution-grade quote. The request must carry a taker address; the
    /// response includes destination, calldata, native value and the
    /// allowance target.
    async fn swap_quote(&self, request: &QuoteRequestBody)
        -> Result<ExecutableQuote, QuoteError>;

    /// Liquidity sources and supported tokens.
    async fn sources(&self) -> Result<SourcesResponse, QuoteError>;
}

/// Configuration options for [`HttpQuoteClient`].
#[derive(Debug, Clone, Default)]
pub struct HttpQuoteClientOptions {
    /// Optional API key, sent as the provider's `api-key` header.
    pub api_key: Option<String>,
}

impl HttpQuoteClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HttpQuoteClient {
    http_client: Client,
    url: Url,
}

impl HttpQuoteClient {
    pub fn new(base_uri: &str, options: HttpQuoteClientOptions) -> Result<Self, QuoteError> {
        let url = base_uri
            .parse::<Url>()
            .map_err(|e| QuoteError::UrlParsing(base_uri.to_string(), e.to_string()))?;

        // Add default headers
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
        let user_agent =
            format!("hyperpool-client-{version}", version = env!("CARGO_PKG_VERSION"));
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_str(&user_agent)
                .map_err(|e| QuoteError::FormatRequest(format!("Invalid user agent: {e}")))?,
        );

        if let Some(key) = options.api_key.as_deref() {
            let mut key_value = header::HeaderValue::from_str(key)
                .map_err(|e| QuoteError::FormatRequest(format!("Invalid api key format: {e}")))?;
            key_value.set_sensitive(true);
            headers.insert("api-key", key_value);
        }

        let http_client = ClientBuilder::new()
            .default_headers(headers)
            .build()
            .map_err(QuoteError::Network)?;
        Ok(Self { http_client, url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/swap/v1/{path}", self.url.as_str().trim_end_matches('/'))
    }

    /// Maps a non-success response into `UpstreamHttp`, keeping the body as
    /// structured detail when it parses and as a plain string otherwise.
    async fn error_for_response(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, QuoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());
        let details = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));
        Err(QuoteError::UpstreamHttp { status: status.as_u16(), details })
    }

    async fn post_json<T: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        request: &T,
    ) -> Result<R, QuoteError> {
        let uri = self.endpoint(path);
        debug!(%uri, "Sending quote request to provider");
        let response = self
            .http_client
            .post(&uri)
            .json(request)
            .send()
            .await
            .map_err(QuoteError::Network)?;
        let response = self.error_for_response(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| QuoteError::ParseResponse(e.to_string()))?;
        trace!(?body, "Received response from provider");
        serde_json::from_str::<R>(&body)
            .map_err(|err| QuoteError::ParseResponse(format!("Error: {err}, Body: {body}")))
    }
}

#[async_trait]
impl QuoteClient for HttpQuoteClient {
    #[instrument(skip(self, request))]
    async fn price_quote(&self, request: &QuoteRequestBody) -> Result<PriceQuote, QuoteError> {
        self.post_json("price", request).await
    }

    #[instrument(skip(self, request))]
    async fn swap_quote(
        &self,
        request: &QuoteRequestBody,
    ) -> Result<ExecutableQuote, QuoteError> {
        if request.taker_address.is_none() {
            return Err(QuoteError::FormatRequest(
                "executable quotes require a taker address".to_string(),
            ));
        }
        self.post_json("quote", request).await
    }

    async fn sources(&self) -> Result<SourcesResponse, QuoteError> {
        let uri = self.endpoint("sources");
        debug!(%uri, "Sending sources request to provider");
        let response = self
            .http_client
            .get(&uri)
            .send()
            .await
            .map_err(QuoteError::Network)?;
        let response = self.error_for_response(response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| QuoteError::ParseResponse(e.to_string()))?;
        serde_json::from_str::<SourcesResponse>(&body)
            .map_err(|err| QuoteError::ParseResponse(format!("Error: {err}, Body: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{Address, U256};
    use mockito::Server;
    use pretty_assertions::assert_eq;

    use super::*;

    fn price_request() -> QuoteRequestBody {
        QuoteRequestBody::new(
            "0xb88339cb7199b77e23db6e890353e22632ba630f"
                .parse()
                .unwrap(),
            "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee"
                .parse()
                .unwrap(),
            U256::from(50_000_000u64),
            0.005,
            None,
        )
    }

    const PRICE_RESPONSE: &str = r#"
    {
        "chainId": 999,
        "price": "2.5",
        "estimatedPriceImpact": "0.02",
        "value": "0",
        "gasPrice": "47500000",
        "gas": "200000",
        "buyTokenAddress": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
        "buyAmount": "20000000000000000000",
        "sellTokenAddress": "0xb88339cb7199b77e23db6e890353e22632ba630f",
        "sellAmount": "50000000",
        "allowanceTarget": "0x4212a77e4533eca49643d7b731f5fb1b2782fe94"
    }
    "#;

    #[test_log::test(tokio::test)]
    async fn test_price_quote() {
        let mut server = Server::new_async().await;
        // test that the response is deserialized correctly
        serde_json::from_str::<PriceQuote>(PRICE_RESPONSE).expect("deserialize");

        let mocked_server = server
            .mock("POST", "/swap/v1/price")
            .expect(1)
            .match_header("content-type", "application/json")
            .with_body(PRICE_RESPONSE)
            .create_async()
            .await;
        let client = HttpQuoteClient::new(server.url().as_str(), HttpQuoteClientOptions::default())
            .expect("create client");

        let quote = client
            .price_quote(&price_request())
            .await
            .expect("get price quote");

        mocked_server.assert();
        assert_eq!(quote.buy_amount(), U256::from(20_000_000_000_000_000_000u128));
        assert_eq!(
            quote.allowance_target,
            "0x4212a77e4533eca49643d7b731f5fb1b2782fe94"
                .parse::<Address>()
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_api_key_header_is_sent() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("POST", "/swap/v1/price")
            .expect(1)
            .match_header("api-key", "secret-key")
            .with_body(PRICE_RESPONSE)
            .create_async()
            .await;
        let client = HttpQuoteClient::new(
            server.url().as_str(),
            HttpQuoteClientOptions::new().with_api_key(Some("secret-key".to_string())),
        )
        .expect("create client");

        client
            .price_quote(&price_request())
            .await
            .expect("get price quote");

        mocked_server.assert();
    }

    #[tokio::test]
    async fn test_upstream_error_surfaces_body() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("POST", "/swap/v1/price")
            .expect(1)
            .with_status(400)
            .with_body(r#"{"error": "insufficient liquidity", "details": {"pair": "USDC/HYPE"}}"#)
            .create_async()
            .await;
        let client = HttpQuoteClient::new(server.url().as_str(), HttpQuoteClientOptions::default())
            .expect("create client");

        let error = client
            .price_quote(&price_request())
            .await
            .expect_err("must fail");

        mocked_server.assert();
        match error {
            QuoteError::UpstreamHttp { status, details } => {
                assert_eq!(status, 400);
                assert_eq!(details["error"], "insufficient liquidity");
                assert_eq!(details["details"]["pair"], "USDC/HYPE");
            }
            other => panic!("expected UpstreamHttp, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_string() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/swap/v1/price")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;
        let client = HttpQuoteClient::new(server.url().as_str(), HttpQuoteClientOptions::default())
            .expect("create client");

        let error = client
            .price_quote(&price_request())
            .await
            .expect_err("must fail");

        match error {
            QuoteError::UpstreamHttp { status, details } => {
                assert_eq!(status, 502);
                assert_eq!(details, Value::String("bad gateway".to_string()));
            }
            other => panic!("expected UpstreamHttp, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unparsable_success_body() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/swap/v1/price")
            .with_body("{not json")
            .create_async()
            .await;
        let client = HttpQuoteClient::new(server.url().as_str(), HttpQuoteClientOptions::default())
            .expect("create client");

        let error = client
            .price_quote(&price_request())
            .await
            .expect_err("must fail");
        assert!(matches!(error, QuoteError::ParseResponse(_)));
    }

    #[tokio::test]
    async fn test_swap_quote_requires_taker() {
        let client = HttpQuoteClient::new("http://localhost:1", HttpQuoteClientOptions::default())
            .expect("create client");

        let error = client
            .swap_quote(&price_request())
            .await
            .expect_err("must fail");
        assert!(matches!(error, QuoteError::FormatRequest(_)));
    }

    #[tokio::test]
    async fn test_sources() {
        let mut server = Server::new_async().await;
        let mocked_server = server
            .mock("GET", "/swap/v1/sources")
            .expect(1)
            .with_body(
                r#"
                {
                    "sources": ["HyperSwap", "KittenSwap"],
                    "tokens": [
                        {
                            "symbol": "USDC",
                            "address": "0xb88339cb7199b77e23db6e890353e22632ba630f",
                            "decimals": 6
                        },
                        {
                            "symbol": "HYPE",
                            "address": "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee",
                            "decimals": 18,
                            "isNative": true
                        }
                    ]
                }
                "#,
            )
            .create_async()
            .await;
        let client = HttpQuoteClient::new(server.url().as_str(), HttpQuoteClientOptions::default())
            .expect("create client");

        let response = client.sources().await.expect("get sources");

        mocked_server.assert();
        assert_eq!(response.sources, vec!["HyperSwap", "KittenSwap"]);
        assert_eq!(response.tokens.len(), 2);
        assert!(response.tokens[1].is_native);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let result = HttpQuoteClient::new("not a url", HttpQuoteClientOptions::default());
        assert!(matches!(result, Err(QuoteError::UrlParsing(_, _))));
    }
}

//! Yahoo Finance chart endpoint.

use crate::error::QuoteError;
use crate::quote::{Quote, QuoteSource};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Configuration for the market-data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Base URL of the chart API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Quote source backed by the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct YahooQuoteSource {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooQuoteSource {
    /// Creates a source from configuration.
    ///
    /// # Errors
    ///
    /// Returns `QuoteError::InvalidBaseUrl` if the base URL does not parse or
    /// cannot take a path, and `QuoteError::RequestFailed` if the HTTP client
    /// cannot be built.
    pub fn new(config: &MarketConfig) -> Result<Self, QuoteError> {
        let invalid = |reason: String| QuoteError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason,
        };
        let base_url = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("llm-flows/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| QuoteError::RequestFailed {
                reason: e.to_string(),
            })?;

        Ok(Self { client, base_url })
    }

    /// Builds the chart URL for a ticker. The ticker is one path segment,
    /// percent-encoded by `Url`.
    fn chart_url(&self, ticker: &str) -> Result<Url, QuoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| QuoteError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: "not a hierarchical URL".to_string(),
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        Ok(url)
    }
}

/// Returns true for symbols like `AAPL`, `BRK-B`, `^GSPC` or `EURUSD=X`.
fn is_valid_ticker(ticker: &str) -> bool {
    ticker.chars().any(|c| c.is_ascii_alphanumeric())
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    #[instrument(skip(self))]
    async fn quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        if !is_valid_ticker(ticker) {
            return Err(QuoteError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        let url = self.chart_url(ticker)?;
        debug!(url = %url, "fetching quote");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            warn!(error = %e, url = %url, "failed to reach quote provider");
            QuoteError::RequestFailed {
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(QuoteError::NotFound {
                ticker: ticker.to_string(),
            });
        }
        if !status.is_success() {
            warn!(url = %url, status = %status, "quote provider returned error");
            return Err(QuoteError::RequestFailed {
                reason: format!("HTTP {status}"),
            });
        }

        let envelope: ChartEnvelope = response.json().await.map_err(|e| QuoteError::InvalidResponse {
            reason: e.to_string(),
        })?;

        let meta = envelope
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .map(|r| r.meta)
            .ok_or_else(|| QuoteError::NotFound {
                ticker: ticker.to_string(),
            })?;

        Ok(Quote {
            ticker: meta.symbol,
            company_name: meta.short_name,
            current_price: meta.regular_market_price,
        })
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_for(server: &MockServer) -> YahooQuoteSource {
        YahooQuoteSource::new(&MarketConfig {
            base_url: server.uri(),
            timeout_seconds: 5,
        })
        .expect("source")
    }

    #[tokio::test]
    async fn reads_chart_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": {
                    "result": [{
                        "meta": {
                            "currency": "USD",
                            "symbol": "AAPL",
                            "shortName": "Apple Inc.",
                            "regularMarketPrice": 231.5
                        },
                        "timestamp": []
                    }],
                    "error": null
                }
            })))
            .mount(&server)
            .await;

        let quote = source_for(&server).quote("AAPL").await.expect("quote");
        assert_eq!(quote, Quote::new("AAPL", "Apple Inc.", 231.5));
    }

    #[tokio::test]
    async fn missing_fields_stay_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": [{ "meta": { "symbol": "XYZ" } }], "error": null }
            })))
            .mount(&server)
            .await;

        let quote = source_for(&server).quote("XYZ").await.expect("quote");
        assert!(quote.company_name.is_none());
        assert!(quote.current_price.is_none());
    }

    #[tokio::test]
    async fn unknown_ticker_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "chart": { "result": null, "error": { "code": "Not Found" } }
            })))
            .mount(&server)
            .await;

        let err = source_for(&server).quote("ZZZZ").await.unwrap_err();
        assert_eq!(
            err,
            QuoteError::NotFound {
                ticker: "ZZZZ".to_string()
            }
        );
    }

    #[tokio::test]
    async fn server_error_is_request_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = source_for(&server).quote("AAPL").await.unwrap_err();
        assert!(matches!(err, QuoteError::RequestFailed { ref reason } if reason.contains("502")));
    }

    #[tokio::test]
    async fn ticker_cannot_leave_the_chart_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": [{ "meta": { "symbol": "OTHER" } }], "error": null }
            })))
            .expect(0)
            .mount(&server)
            .await;

        let source = source_for(&server);
        for ticker in ["../../other", "AAPL/../../other", "AAPL?range=1y", "..", ""] {
            let err = source.quote(ticker).await.unwrap_err();
            assert_eq!(
                err,
                QuoteError::NotFound {
                    ticker: ticker.to_string()
                }
            );
        }
    }

    #[tokio::test]
    async fn symbol_punctuation_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/BRK-B"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": [{ "meta": { "symbol": "BRK-B" } }], "error": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let quote = source_for(&server).quote("BRK-B").await.expect("quote");
        assert_eq!(quote.ticker, "BRK-B");
    }

    #[tokio::test]
    async fn base_url_path_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/proxy/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chart": { "result": [{ "meta": { "symbol": "AAPL" } }], "error": null }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let source = YahooQuoteSource::new(&MarketConfig {
            base_url: format!("{}/proxy/", server.uri()),
            timeout_seconds: 5,
        })
        .expect("source");
        let quote = source.quote("AAPL").await.expect("quote");
        assert_eq!(quote.ticker, "AAPL");
    }

    #[test]
    fn rejects_unusable_base_url() {
        let err = YahooQuoteSource::new(&MarketConfig {
            base_url: "not a url".to_string(),
            timeout_seconds: 5,
        })
        .unwrap_err();
        assert!(matches!(err, QuoteError::InvalidBaseUrl { ref url, .. } if url == "not a url"));
    }

    #[test]
    fn ticker_charset() {
        for ticker in ["AAPL", "BRK-B", "^GSPC", "EURUSD=X", "RDS.A"] {
            assert!(is_valid_ticker(ticker), "{ticker}");
        }
        for ticker in ["", "..", "-", "A/B", "AAPL?x=1", "A B", "A%2F"] {
            assert!(!is_valid_ticker(ticker), "{ticker}");
        }
    }
}

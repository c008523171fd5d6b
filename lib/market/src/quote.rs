//! Quote source trait and the in-memory implementation.

use crate::error::QuoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Basic market data for one ticker.
///
/// Providers do not always report every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol as reported by the provider.
    pub ticker: String,
    /// Short company name.
    pub company_name: Option<String>,
    /// Latest traded price.
    pub current_price: Option<f64>,
}

impl Quote {
    /// Creates a quote with every field present.
    #[must_use]
    pub fn new(ticker: impl Into<String>, company_name: impl Into<String>, current_price: f64) -> Self {
        Self {
            ticker: ticker.into(),
            company_name: Some(company_name.into()),
            current_price: Some(current_price),
        }
    }
}

/// A market-data provider.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetches the latest quote for a ticker.
    async fn quote(&self, ticker: &str) -> Result<Quote, QuoteError>;

    /// Returns the provider name, for logging.
    fn name(&self) -> &str;
}

/// Serves fixed quotes, keyed by upper-cased ticker.
#[derive(Debug, Clone, Default)]
pub struct StaticQuoteSource {
    quotes: HashMap<String, Quote>,
}

impl StaticQuoteSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a quote.
    #[must_use]
    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quotes.insert(quote.ticker.to_ascii_uppercase(), quote);
        self
    }
}

#[async_trait]
impl QuoteSource for StaticQuoteSource {
    async fn quote(&self, ticker: &str) -> Result<Quote, QuoteError> {
        self.quotes
            .get(&ticker.to_ascii_uppercase())
            .cloned()
            .ok_or_else(|| QuoteError::NotFound {
                ticker: ticker.to_string(),
            })
    }

    fn name(&self) -> &str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_ignores_case() {
        let source = StaticQuoteSource::new().with_quote(Quote::new("AAPL", "Apple Inc.", 231.5));

        let quote = source.quote("aapl").await.expect("quote");
        assert_eq!(quote.company_name.as_deref(), Some("Apple Inc."));

        let err = source.quote("NVDA").await.unwrap_err();
        assert!(matches!(err, QuoteError::NotFound { .. }));
    }
}

//! Error types for market data lookups.

use thiserror::Error;

/// Errors from a quote source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// The provider has no data for the ticker.
    #[error("no quote found for '{ticker}'")]
    NotFound { ticker: String },
    /// The provider could not be reached or returned an error status.
    #[error("quote provider request failed: {reason}")]
    RequestFailed { reason: String },
    /// The configured base URL cannot carry a chart path.
    #[error("invalid quote provider URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    /// The provider's response could not be parsed.
    #[error("invalid quote response: {reason}")]
    InvalidResponse { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_ticker() {
        let err = QuoteError::NotFound {
            ticker: "ZZZZ".to_string(),
        };
        assert_eq!(err.to_string(), "no quote found for 'ZZZZ'");
    }
}

//! The `get_stock` tool.

use crate::quote::QuoteSource;
use async_trait::async_trait;
use llm_flows_ai::ToolDefinition;
use llm_flows_conversation::{Tool, ToolError, required_str};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// Name under which the tool is declared.
///
/// The tool is only ever offered as `get_stock`. A model that asks for it
/// under another name, such as `lookup`, gets `ToolError::UnknownTool`; the
/// registry does not alias names.
pub const TOOL_NAME: &str = "get_stock";

/// Output of the `get_stock` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    /// Ticker as requested.
    pub ticker: String,
    /// Company name, or the ticker when the provider has none.
    pub company_name: String,
    /// Current price, or 0 when the provider has none.
    pub current_price: f64,
}

/// Looks up basic stock information through a [`QuoteSource`].
#[derive(Clone)]
pub struct StockLookupTool {
    source: Arc<dyn QuoteSource>,
}

impl StockLookupTool {
    /// Creates the tool over a quote source.
    #[must_use]
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        Self { source }
    }

    /// Fetches a quote and fills in missing fields.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::ExecutionFailed` if the source fails.
    pub async fn lookup(&self, ticker: &str) -> Result<StockQuote, ToolError> {
        let quote = self
            .source
            .quote(ticker)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: TOOL_NAME.to_string(),
                reason: e.to_string(),
            })?;

        Ok(StockQuote {
            ticker: ticker.to_string(),
            company_name: quote.company_name.unwrap_or_else(|| ticker.to_string()),
            current_price: quote.current_price.unwrap_or(0.0),
        })
    }
}

#[async_trait]
impl Tool for StockLookupTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(TOOL_NAME, "Returns basic information about a stock")
            .with_required_string("ticker", "Stock symbol (e.g. AAPL, NVDA)")
    }

    async fn call(&self, arguments: JsonValue) -> Result<JsonValue, ToolError> {
        let ticker = required_str(TOOL_NAME, &arguments, "ticker")?;
        let quote = self.lookup(ticker).await?;
        serde_json::to_value(quote).map_err(|e| ToolError::ExecutionFailed {
            name: TOOL_NAME.to_string(),
            reason: e.to_string(),
        })
    }
}

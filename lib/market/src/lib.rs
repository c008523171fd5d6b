//! Market data for llm-flows.
//!
//! This crate provides:
//!
//! - **Quote sources**: a trait over market-data providers, with an HTTP
//!   implementation and a fixed in-memory one
//! - **Stock lookup tool**: the `get_stock` tool offered to the completion
//!   service

pub mod error;
pub mod quote;
pub mod tool;
pub mod yahoo;

pub use error::QuoteError;
pub use quote::{Quote, QuoteSource, StaticQuoteSource};
pub use tool::{StockLookupTool, StockQuote};
pub use yahoo::{MarketConfig, YahooQuoteSource};

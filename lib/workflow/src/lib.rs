//! Calendar and market pipelines for llm-flows.
//!
//! Each pipeline composes the primitives of `llm-flows-ai` and
//! `llm-flows-conversation`:
//!
//! - **Extraction**: free text to a typed record in one call
//! - **Stock**: a tool-call round trip over market data
//! - **Validation**: two checks in parallel gating a request
//! - **Chain**: classify, gate, detail and confirm in sequence
//! - **Router**: classify once and dispatch to a handler
//!
//! Every entry point takes a [`PipelineContext`].

pub mod chain;
pub mod context;
pub mod error;
pub mod extraction;
pub mod policy;
mod prompts;
pub mod router;
pub mod stage;
pub mod stock;
pub mod validation;

pub use chain::{EventConfirmation, EventDetails, EventExtraction, process_calendar_request};
pub use context::{PipelineConfig, PipelineContext};
pub use error::{PipelineError, PipelineReportExt};
pub use extraction::{CalendarEvent, extract_calendar_event};
pub use policy::ConfidencePolicy;
pub use router::{
    CalendarRequestType, CalendarResponse, Change, ModifyEventDetails, NewEventDetails, RequestType,
    route_calendar_request,
};
pub use stage::{PipelineRun, PipelineStage};
pub use stock::{answer_stock_question, stock_tools};
pub use validation::{
    CalendarValidation, SafetyCheck, ValidationOutcome, accept, validate_request,
    validate_request_detailed,
};

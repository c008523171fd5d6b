//! Error handling foundation for llm-flows.
//!
//! Each crate defines its own domain-specific error types in its own error
//! module. Lower-layer failures are not stored inside those types: callers
//! wrap them with rootcause's `.context()`, so a [`Report`] carries one node
//! per layer the failure crossed.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
///
/// Each layer adds its own context via `.context()` as errors propagate.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

/// Returns the first context of type `E` anywhere in `report`, searching the
/// report itself and then its causes depth-first.
#[must_use]
pub fn find_context<E, C>(report: &Report<C>) -> Option<&E>
where
    E: Sized + 'static,
    C: ?Sized,
{
    report
        .iter_reports()
        .find_map(|node| node.downcast_current_context::<E>())
}

//! Strongly-typed ID types.
//!
//! All IDs use ULID format, so they sort by creation time, which keeps log
//! lines from one pipeline run in order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Generates a ULID-backed ID type displayed as `<prefix>_<ulid>`.
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Creates a new ID with a randomly generated ULID.
            #[must_use]
            pub fn new() -> Self {
                Self(Ulid::new())
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw = s.strip_prefix(concat!($prefix, "_")).unwrap_or(s);
                Ulid::from_str(raw).map(Self).map_err(|e| ParseIdError {
                    id_type: stringify!($name),
                    reason: e.to_string(),
                })
            }
        }

        impl From<Ulid> for $name {
            fn from(ulid: Ulid) -> Self {
                Self(ulid)
            }
        }
    };
}

define_id!(
    /// Identifies one request/response exchange with the completion service.
    LlmInvocationId,
    "llm"
);

define_id!(
    /// Identifies one conversation (the turns of a tool-calling exchange).
    ConversationId,
    "conv"
);

define_id!(
    /// Identifies one top-level pipeline invocation.
    PipelineRunId,
    "run"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        assert!(LlmInvocationId::new().to_string().starts_with("llm_"));
        assert!(ConversationId::new().to_string().starts_with("conv_"));
        assert!(PipelineRunId::new().to_string().starts_with("run_"));
    }

    #[test]
    fn parses_prefixed_and_raw_forms() {
        let id = PipelineRunId::new();
        let prefixed: PipelineRunId = id.to_string().parse().expect("prefixed");
        let raw: PipelineRunId = id.as_ulid().to_string().parse().expect("raw");
        assert_eq!(prefixed, id);
        assert_eq!(raw, id);
    }

    #[test]
    fn rejects_garbage() {
        let err = "conv_not-a-ulid".parse::<ConversationId>().unwrap_err();
        assert_eq!(err.id_type, "ConversationId");
    }

    #[test]
    fn serializes_as_bare_ulid() {
        let id = LlmInvocationId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }

    #[test]
    fn ids_order_by_creation() {
        let first = PipelineRunId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = PipelineRunId::new();
        assert!(first.as_ulid() < second.as_ulid());
    }
}

//! Scripted backend for tests.
//!
//! Replays queued responses instead of calling a service and records every
//! request it receives, so tests can assert on call counts and on exactly
//! what a pipeline sent.

use crate::backend::{LlmBackend, LlmRequest, LlmResponse, ToolInvocation};
use crate::error::LlmError;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

const MODEL: &str = "scripted";

type Reply = Result<LlmResponse, LlmError>;

#[derive(Debug, Default)]
struct Script {
    /// Replies served in order to any request.
    queue: VecDeque<Reply>,
    /// Replies reserved for requests with a given output schema name.
    by_schema: HashMap<String, VecDeque<Reply>>,
    requests: Vec<LlmRequest>,
}

/// A backend that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    /// Creates a backend with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply served to the next request.
    #[must_use]
    pub fn with_reply(self, reply: Reply) -> Self {
        self.lock().queue.push_back(reply);
        self
    }

    /// Queues a structured response.
    #[must_use]
    pub fn with_structured(self, value: JsonValue) -> Self {
        self.with_reply(Ok(LlmResponse::structured(MODEL, value)))
    }

    /// Queues a plain text response.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_reply(Ok(LlmResponse::text(MODEL, text)))
    }

    /// Queues a response requesting tool invocations.
    #[must_use]
    pub fn with_tool_calls(self, calls: Vec<ToolInvocation>) -> Self {
        self.with_reply(Ok(LlmResponse::tool_calls(MODEL, calls)))
    }

    /// Queues a failure.
    #[must_use]
    pub fn with_error(self, error: LlmError) -> Self {
        self.with_reply(Err(error))
    }

    /// Reserves a structured response for the next request whose output
    /// schema has the given name.
    #[must_use]
    pub fn with_structured_for(self, schema: &str, value: JsonValue) -> Self {
        self.with_reply_for(schema, Ok(LlmResponse::structured(MODEL, value)))
    }

    /// Reserves a reply for the next request whose output schema has the
    /// given name.
    #[must_use]
    pub fn with_reply_for(self, schema: &str, reply: Reply) -> Self {
        self.lock()
            .by_schema
            .entry(schema.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Returns every request received so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.lock().requests.clone()
    }

    /// Returns the number of requests received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Returns the output schema names of the requests received, in order.
    #[must_use]
    pub fn schemas_requested(&self) -> Vec<String> {
        self.lock()
            .requests
            .iter()
            .filter_map(|r| r.output_schema.as_ref().map(|s| s.name.clone()))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let mut script = self.lock();
        script.requests.push(request.clone());

        let keyed = match &request.output_schema {
            Some(schema) => script
                .by_schema
                .get_mut(&schema.name)
                .and_then(VecDeque::pop_front),
            None => None,
        };

        keyed
            .or_else(|| script.queue.pop_front())
            .unwrap_or_else(|| {
                Err(LlmError::RequestFailed {
                    reason: "scripted backend has no reply queued".to_string(),
                })
            })
    }

    fn provider(&self) -> &str {
        MODEL
    }
}

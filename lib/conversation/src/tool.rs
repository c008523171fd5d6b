//! Tool registry for tool-calling exchanges.
//!
//! Tools are local functions the completion service may ask to run. Each
//! tool declares itself with a [`ToolDefinition`] and receives its
//! arguments as a JSON object.

use crate::error::ToolError;
use async_trait::async_trait;
use llm_flows_ai::{ToolDefinition, ToolInvocation};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Trait for tool execution.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool declaration sent to the service.
    fn definition(&self) -> ToolDefinition;

    /// Runs the tool with a JSON object of arguments.
    async fn call(&self, arguments: JsonValue) -> Result<JsonValue, ToolError>;
}

/// Registry of available tools, in registration order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        match self.tools.iter().position(|t| t.definition().name == name) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    /// Registers a tool, builder style.
    #[must_use]
    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    /// Gets a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.definition().name == name)
    }

    /// Returns the tool declarations, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Returns the registered tool names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.definition().name).collect()
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Resolves one invocation and returns the serialized tool output.
    ///
    /// # Errors
    ///
    /// `UnknownTool` if no tool has the requested name, `InvalidArguments` if
    /// the payload is not a JSON object, and whatever the tool itself returns.
    #[instrument(skip_all, fields(tool = %invocation.name, call_id = %invocation.id))]
    pub async fn execute(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
        let tool = self.get(&invocation.name).ok_or_else(|| ToolError::UnknownTool {
            name: invocation.name.clone(),
        })?;

        let arguments = invocation
            .parse_arguments()
            .map_err(|e| ToolError::InvalidArguments {
                name: invocation.name.clone(),
                reason: e.to_string(),
            })?;
        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments {
                name: invocation.name.clone(),
                reason: "arguments must be a JSON object".to_string(),
            });
        }

        let output = tool.call(arguments).await?;
        debug!("tool call resolved");

        serde_json::to_string(&output).map_err(|e| ToolError::ExecutionFailed {
            name: invocation.name.clone(),
            reason: e.to_string(),
        })
    }
}

/// Reads a required string argument.
///
/// # Errors
///
/// Returns `InvalidArguments` if the key is missing or not a string.
pub fn required_str<'a>(tool: &str, arguments: &'a JsonValue, key: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(key)
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ToolError::InvalidArguments {
            name: tool.to_string(),
            reason: format!("missing string parameter `{key}`"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("echo", "Echoes its text").with_required_string("text", "Text")
        }

        async fn call(&self, arguments: JsonValue) -> Result<JsonValue, ToolError> {
            let text = required_str("echo", &arguments, "text")?;
            Ok(serde_json::json!({ "echo": text }))
        }
    }

    struct Clock(&'static str);

    #[async_trait]
    impl Tool for Clock {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition::new("clock", self.0)
        }

        async fn call(&self, _arguments: JsonValue) -> Result<JsonValue, ToolError> {
            Ok(serde_json::json!("12:00"))
        }
    }

    #[test]
    fn definitions_keep_registration_order() {
        let registry = ToolRegistry::new().with_tool(Echo).with_tool(Clock("Current time"));
        let names: Vec<_> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["echo", "clock"]);
    }

    #[test]
    fn same_name_replaces() {
        let registry = ToolRegistry::new()
            .with_tool(Clock("old"))
            .with_tool(Clock("new"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.definitions()[0].description, "new");
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let output = registry
            .execute(&ToolInvocation::new("call_1", "echo", r#"{"text":"hi"}"#))
            .await
            .expect("execute");
        assert_eq!(output, r#"{"echo":"hi"}"#);
    }

    #[tokio::test]
    async fn unknown_tool_is_rejected() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let err = registry
            .execute(&ToolInvocation::new("call_1", "missing", "{}"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::UnknownTool {
                name: "missing".to_string()
            }
        );
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let registry = ToolRegistry::new().with_tool(Echo);

        for arguments in ["[1, 2]", "not json", r#""text""#] {
            let err = registry
                .execute(&ToolInvocation::new("call_1", "echo", arguments))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments { .. }), "{arguments}");
        }
    }

    #[tokio::test]
    async fn missing_parameter_is_rejected() {
        let registry = ToolRegistry::new().with_tool(Echo);
        let err = registry
            .execute(&ToolInvocation::new("call_1", "echo", "{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref reason, .. } if reason.contains("text")));
    }
}

//! Tool declarations sent to the completion service.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Declaration of a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON schema for the tool's parameters, including its `required` list.
    pub parameters: JsonValue,
}

impl ToolDefinition {
    /// Creates a tool definition that takes no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, schema: JsonValue) -> Self {
        self.parameters = schema;
        self
    }

    /// Adds a required string parameter to the schema.
    #[must_use]
    pub fn with_required_string(mut self, name: &str, description: &str) -> Self {
        if let Some(properties) = self
            .parameters
            .get_mut("properties")
            .and_then(JsonValue::as_object_mut)
        {
            properties.insert(
                name.to_string(),
                serde_json::json!({ "type": "string", "description": description }),
            );
        }
        if let Some(required) = self
            .parameters
            .get_mut("required")
            .and_then(JsonValue::as_array_mut)
        {
            required.push(JsonValue::String(name.to_string()));
        }
        self
    }

    /// Returns the names of the required parameters.
    #[must_use]
    pub fn required_parameters(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(JsonValue::as_array)
            .map(|names| names.iter().filter_map(JsonValue::as_str).collect())
            .unwrap_or_default()
    }
}

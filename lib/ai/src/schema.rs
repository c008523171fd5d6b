//! Output schema contract.
//!
//! The completion service is untrusted: whatever it returns is checked
//! against the declared schema before it reaches a pipeline. Validation fails
//! closed. A missing required field, a type mismatch, text that is not JSON,
//! or a response with no payload at all is a `SchemaValidation` error, never
//! a default value.

use crate::backend::LlmResponse;
use crate::error::ExtractionError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A named JSON schema the output of a call must conform to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name, as sent to the service.
    pub name: String,
    /// The JSON schema document.
    pub schema: JsonValue,
    /// Whether the service should enforce the schema strictly.
    pub strict: bool,
}

impl OutputSchema {
    /// Derives the schema of `T`.
    ///
    /// Doc comments on fields become per-field descriptions. The schema is
    /// normalized to strict form: every property is required (optional
    /// fields must be present and may be `null`) and unknown properties are
    /// disallowed.
    #[must_use]
    pub fn for_type<T: JsonSchema>() -> Self {
        let mut schema = schemars::schema_for!(T).to_value();
        if let Some(root) = schema.as_object_mut() {
            root.remove("$schema");
        }
        make_strict(&mut schema);

        Self {
            name: sanitize_name(&T::schema_name()),
            schema,
            strict: true,
        }
    }

    /// Wraps a hand-written schema as-is.
    #[must_use]
    pub fn new(name: impl Into<String>, schema: JsonValue) -> Self {
        Self {
            name: sanitize_name(&name.into()),
            schema,
            strict: false,
        }
    }

    /// Checks a value against the schema.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self, value: &JsonValue) -> Result<(), String> {
        self.check(value, &self.schema, "$", 0)
    }

    /// Validates a response against the schema and deserializes it.
    ///
    /// The structured payload is taken from `structured_output` when the
    /// backend already parsed it, otherwise from the response text (with any
    /// markdown code fence stripped).
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError::SchemaValidation` if the response carries no
    /// JSON payload, violates the schema, or does not deserialize into `T`.
    pub fn parse<T: DeserializeOwned>(&self, response: &LlmResponse) -> Result<T, ExtractionError> {
        let invalid = |reason: String| ExtractionError::SchemaValidation {
            schema: self.name.clone(),
            reason,
        };

        let value = match &response.structured_output {
            Some(value) => value.clone(),
            None => {
                let text = strip_code_fence(&response.content);
                if text.is_empty() {
                    return Err(invalid("response contained no structured output".to_string()));
                }
                serde_json::from_str(text)
                    .map_err(|e| invalid(format!("response is not valid JSON: {e}")))?
            }
        };

        self.validate(&value).map_err(invalid)?;
        serde_json::from_value(value).map_err(|e| invalid(e.to_string()))
    }

    fn check(&self, value: &JsonValue, schema: &JsonValue, path: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_REF_DEPTH {
            return Err(format!("schema nesting too deep at {path}"));
        }
        let Some(schema) = schema.as_object() else {
            // `true` accepts anything, `false` nothing.
            return if schema.as_bool() == Some(false) {
                Err(format!("no value is allowed at {path}"))
            } else {
                Ok(())
            };
        };

        if let Some(reference) = schema.get("$ref").and_then(JsonValue::as_str) {
            let target = self.resolve(reference).ok_or_else(|| format!("unresolvable reference '{reference}'"))?;
            return self.check(value, target, path, depth + 1);
        }

        for keyword in ["anyOf", "oneOf"] {
            if let Some(branches) = schema.get(keyword).and_then(JsonValue::as_array) {
                if !branches
                    .iter()
                    .any(|branch| self.check(value, branch, path, depth + 1).is_ok())
                {
                    return Err(format!("{path} does not match any allowed shape"));
                }
            }
        }

        if let Some(allowed) = schema.get("enum").and_then(JsonValue::as_array)
            && !allowed.contains(value)
        {
            return Err(format!("{path} must be one of {}, got {value}", JsonValue::Array(allowed.clone())));
        }

        if let Some(constant) = schema.get("const")
            && constant != value
        {
            return Err(format!("{path} must be {constant}, got {value}"));
        }

        if let Some(expected) = schema.get("type") {
            let matches = match expected {
                JsonValue::String(name) => type_matches(name, value),
                JsonValue::Array(names) => names
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .any(|name| type_matches(name, value)),
                _ => true,
            };
            if !matches {
                return Err(format!("{path} expected {expected}, got {}", type_name(value)));
            }
        }

        if let JsonValue::Object(fields) = value {
            if let Some(required) = schema.get("required").and_then(JsonValue::as_array) {
                for key in required.iter().filter_map(JsonValue::as_str) {
                    if !fields.contains_key(key) {
                        return Err(format!("missing field `{key}` at {path}"));
                    }
                }
            }
            if let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) {
                for (key, child_schema) in properties {
                    if let Some(child) = fields.get(key) {
                        self.check(child, child_schema, &format!("{path}.{key}"), depth + 1)?;
                    }
                }
            }
        }

        if let (JsonValue::Array(items), Some(item_schema)) = (value, schema.get("items")) {
            for (index, item) in items.iter().enumerate() {
                self.check(item, item_schema, &format!("{path}[{index}]"), depth + 1)?;
            }
        }

        Ok(())
    }

    fn resolve(&self, reference: &str) -> Option<&JsonValue> {
        if reference == "#" {
            return Some(&self.schema);
        }
        reference
            .strip_prefix('#')
            .and_then(|pointer| self.schema.pointer(pointer))
    }
}

const MAX_REF_DEPTH: usize = 64;

fn type_matches(name: &str, value: &JsonValue) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "integer" => value.is_i64() || value.is_u64(),
        "number" => value.is_number(),
        _ => false,
    }
}

fn type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(n) if n.is_f64() => "number",
        JsonValue::Number(_) => "integer",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Marks every property required and closes every object schema.
fn make_strict(schema: &mut JsonValue) {
    let Some(node) = schema.as_object_mut() else {
        return;
    };

    if let Some(JsonValue::Object(properties)) = node.get_mut("properties") {
        let keys = properties.keys().cloned().map(JsonValue::String).collect();
        for child in properties.values_mut() {
            make_strict(child);
        }
        node.insert("required".to_string(), JsonValue::Array(keys));
        node.insert("additionalProperties".to_string(), JsonValue::Bool(false));
    }

    if let Some(JsonValue::Object(defs)) = node.get_mut("$defs") {
        for child in defs.values_mut() {
            make_strict(child);
        }
    }

    if let Some(items) = node.get_mut("items") {
        make_strict(items);
    }

    for keyword in ["anyOf", "oneOf", "allOf"] {
        if let Some(JsonValue::Array(branches)) = node.get_mut(keyword) {
            for branch in branches {
                make_strict(branch);
            }
        }
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Strips a surrounding markdown code fence (```json ... ```), if any.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// A meeting mentioned in text.
    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Meeting {
        /// Meeting title.
        title: String,
        /// Expected duration in minutes.
        duration_minutes: Option<u32>,
        /// People attending.
        attendees: Vec<String>,
        /// Agenda items.
        agenda: Vec<AgendaItem>,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct AgendaItem {
        /// Topic to discuss.
        topic: String,
        /// Whether a decision is expected.
        needs_decision: bool,
    }

    fn response(value: JsonValue) -> LlmResponse {
        LlmResponse::structured("test-model", value)
    }

    #[test]
    fn derived_schema_is_strict_and_documented() {
        let schema = OutputSchema::for_type::<Meeting>();
        assert_eq!(schema.name, "Meeting");
        assert!(schema.strict);
        assert!(schema.schema.get("$schema").is_none());

        let required: Vec<_> = schema.schema["required"]
            .as_array()
            .expect("required list")
            .iter()
            .filter_map(JsonValue::as_str)
            .collect();
        assert!(required.contains(&"duration_minutes"));
        assert_eq!(schema.schema["additionalProperties"], false);
        assert_eq!(
            schema.schema["properties"]["title"]["description"],
            "Meeting title."
        );
        assert_eq!(
            schema.schema["$defs"]["AgendaItem"]["additionalProperties"],
            false
        );
    }

    #[test]
    fn parses_conforming_output() {
        let schema = OutputSchema::for_type::<Meeting>();
        let meeting: Meeting = schema
            .parse(&response(serde_json::json!({
                "title": "Team sync",
                "duration_minutes": null,
                "attendees": ["Daniel", "Alberto"],
                "agenda": [{ "topic": "Roadmap", "needs_decision": true }]
            })))
            .expect("valid");

        assert_eq!(meeting.title, "Team sync");
        assert_eq!(meeting.duration_minutes, None);
        assert_eq!(meeting.agenda[0].topic, "Roadmap");
    }

    #[test]
    fn missing_optional_field_fails_closed() {
        let schema = OutputSchema::for_type::<Meeting>();
        let err = schema
            .parse::<Meeting>(&response(serde_json::json!({
                "title": "Team sync",
                "attendees": [],
                "agenda": []
            })))
            .unwrap_err();

        assert!(err.is_schema_validation());
        assert!(err.to_string().contains("duration_minutes"));
    }

    #[test]
    fn type_mismatch_fails_closed() {
        let schema = OutputSchema::for_type::<Meeting>();
        let err = schema
            .parse::<Meeting>(&response(serde_json::json!({
                "title": "Team sync",
                "duration_minutes": "two hours",
                "attendees": [],
                "agenda": []
            })))
            .unwrap_err();
        assert!(err.to_string().contains("$.duration_minutes"));
    }

    #[test]
    fn nested_definition_is_checked() {
        let schema = OutputSchema::for_type::<Meeting>();
        let err = schema
            .parse::<Meeting>(&response(serde_json::json!({
                "title": "Team sync",
                "duration_minutes": 30,
                "attendees": [],
                "agenda": [{ "topic": "Roadmap" }]
            })))
            .unwrap_err();
        assert!(err.to_string().contains("needs_decision"));
    }

    #[test]
    fn falls_back_to_fenced_text() {
        let schema = OutputSchema::for_type::<AgendaItem>();
        let text = LlmResponse::text(
            "test-model",
            "```json\n{\"topic\": \"Budget\", \"needs_decision\": false}\n```",
        );
        let item: AgendaItem = schema.parse(&text).expect("fenced json");
        assert_eq!(item.topic, "Budget");
    }

    #[test]
    fn non_json_text_fails_closed() {
        let schema = OutputSchema::for_type::<AgendaItem>();
        let err = schema
            .parse::<AgendaItem>(&LlmResponse::text("test-model", "Sure! The topic is budget."))
            .unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));

        let err = schema
            .parse::<AgendaItem>(&LlmResponse::text("test-model", "  "))
            .unwrap_err();
        assert!(err.to_string().contains("no structured output"));
    }

    #[test]
    fn enum_values_are_enforced() {
        let schema = OutputSchema::new(
            "Kind",
            serde_json::json!({
                "type": "object",
                "properties": { "kind": { "type": "string", "enum": ["a", "b"] } },
                "required": ["kind"]
            }),
        );
        assert!(schema.validate(&serde_json::json!({ "kind": "a" })).is_ok());
        let err = schema
            .validate(&serde_json::json!({ "kind": "c" }))
            .unwrap_err();
        assert!(err.contains("must be one of"));
    }

    /// Priority of an agenda item.
    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    #[serde(rename_all = "snake_case")]
    enum Priority {
        /// Must be discussed.
        High,
        /// Can wait.
        Low,
    }

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Item {
        priority: Priority,
    }

    #[test]
    fn documented_enum_variants_are_enforced() {
        let schema = OutputSchema::for_type::<Item>();
        let item: Item = schema
            .parse(&response(serde_json::json!({ "priority": "high" })))
            .expect("valid");
        assert_eq!(item.priority, Priority::High);

        let err = schema
            .parse::<Item>(&response(serde_json::json!({ "priority": "urgent" })))
            .unwrap_err();
        assert!(err.is_schema_validation());
    }

    #[test]
    fn strip_code_fence_variants() {
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```json\n[1]\n```  "), "[1]");
    }

    #[test]
    fn names_are_sanitized() {
        let schema = OutputSchema::new("Wrapper<Event>", serde_json::json!({}));
        assert_eq!(schema.name, "Wrapper_Event_");
    }
}

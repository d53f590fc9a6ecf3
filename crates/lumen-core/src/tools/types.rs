//! Tool-related type definitions

use crate::error::ToolExecutionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A tool call requested by the LLM
///
/// While streaming, `arguments` is a raw buffer of JSON fragments; it is only
/// parsed once the provider signals the call is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Position in the provider's parallel-call array, the streaming merge key
    #[serde(default)]
    pub index: usize,
    /// Provider-issued or generated call identifier
    #[serde(default)]
    pub id: String,
    /// Tool/action name
    #[serde(default)]
    pub name: String,
    /// Raw JSON argument text
    #[serde(default)]
    pub arguments: String,
    /// Opaque provider continuation token, round-tripped unmodified
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought_signature: Option<String>,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(
        index: usize,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            index,
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            thought_signature: None,
        }
    }

    /// Attach a thought signature
    pub fn with_thought_signature(mut self, signature: impl Into<String>) -> Self {
        self.thought_signature = Some(signature.into());
        self
    }

    /// Parse the accumulated argument buffer
    ///
    /// An empty buffer is an empty object; anything that is not a JSON object
    /// is rejected.
    pub fn parse_arguments(&self) -> Result<Value, ToolExecutionError> {
        if self.arguments.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(other) => Err(ToolExecutionError::InvalidArguments {
                name: self.name.clone(),
                message: format!("expected a JSON object, got {}", other),
            }),
            Err(e) => Err(ToolExecutionError::InvalidArguments {
                name: self.name.clone(),
                message: e.to_string(),
            }),
        }
    }
}

/// Tool description advertised to the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object
    pub parameters: Value,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// The tools available for one request, keyed by name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolSpec>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous entry with the same name
    pub fn register(&mut self, spec: ToolSpec) {
        self.tools.insert(spec.name.clone(), spec);
    }

    pub fn with_tool(mut self, spec: ToolSpec) -> Self {
        self.register(spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Specs in name order, as sent to the provider
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().cloned().collect()
    }
}

/// Completion value of a tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub result: Value,
    pub call_id: String,
}

impl ToolOutput {
    pub fn new(result: impl Into<Value>, call_id: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            call_id: call_id.into(),
        }
    }
}

/// Lifecycle status of a tool call as reported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Pending,
    Completed,
    Error,
    Skipped,
}

/// Entry of the handler's append-only tool call log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub status: ToolCallStatus,
}

impl ToolCallRecord {
    pub fn new(call: &ToolCall, status: ToolCallStatus, result: Option<String>) -> Self {
        Self {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call
                .parse_arguments()
                .unwrap_or_else(|_| Value::String(call.arguments.clone())),
            result,
            status,
        }
    }
}

/// Render a tool result the way it is shown to clients and written into
/// provider messages that only accept text
pub fn stringify_result(result: &Value) -> String {
    match result {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_arguments() {
        let call = ToolCall::new(0, "c1", "get_weather", r#"{"city":"Paris"}"#);
        assert_eq!(call.parse_arguments().unwrap(), json!({"city": "Paris"}));

        let empty = ToolCall::new(0, "c2", "ping", "  ");
        assert_eq!(empty.parse_arguments().unwrap(), json!({}));
    }

    #[test]
    fn test_parse_arguments_rejects_partial_and_non_objects() {
        let partial = ToolCall::new(0, "c1", "get_weather", r#"{"city":"#);
        assert!(matches!(
            partial.parse_arguments(),
            Err(ToolExecutionError::InvalidArguments { .. })
        ));

        let array = ToolCall::new(0, "c1", "get_weather", "[1,2]");
        assert!(array.parse_arguments().is_err());
    }

    #[test]
    fn test_registry() {
        let registry = ToolRegistry::new()
            .with_tool(ToolSpec::new("search", "Search docs", json!({"type": "object"})))
            .with_tool(ToolSpec::new("calc", "Calculator", json!({"type": "object"})));
        assert!(registry.contains("search"));
        let names: Vec<_> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["calc", "search"]);
    }

    #[test]
    fn test_stringify_result() {
        assert_eq!(stringify_result(&json!("plain")), "plain");
        assert_eq!(stringify_result(&json!({"temp": "15C"})), r#"{"temp":"15C"}"#);
    }
}

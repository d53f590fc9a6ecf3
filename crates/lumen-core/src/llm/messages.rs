//! LLM message types and structures

use crate::tools::types::ToolCall;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message (human input)
    User,
    /// Assistant message (Google calls this role "model")
    #[serde(alias = "model")]
    Assistant,
    /// Tool message (tool execution result)
    Tool,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// Payload of a function response part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponsePayload {
    pub result: Value,
}

/// A typed part of a structured message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },
    /// The model asked for a tool invocation
    FunctionCall {
        name: String,
        args: Value,
        call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thought_signature: Option<String>,
    },
    /// Result of a tool invocation, correlated by `call_id`
    FunctionResponse {
        name: String,
        response: FunctionResponsePayload,
        call_id: String,
    },
    /// File sent natively to the provider
    File {
        name: String,
        mime_type: String,
        uri: String,
    },
}

/// Message content: plain text or a sequence of typed parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A message in the LLM conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: MessageContent,
}

impl LlmMessage {
    /// Create a message with arbitrary role and content
    pub fn new(role: MessageRole, content: impl Into<MessageContent>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content.into())
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content.into())
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content.into())
    }

    /// Create a tool message carrying structured parts
    pub fn tool(parts: Vec<ContentPart>) -> Self {
        Self::new(MessageRole::Tool, MessageContent::Parts(parts))
    }

    /// Assistant message recording a requested tool invocation
    ///
    /// Arguments that are not valid JSON are kept as a JSON string so the
    /// provider still sees exactly what the model produced.
    pub fn function_call(call: &ToolCall) -> Self {
        let args = call
            .parse_arguments()
            .unwrap_or_else(|_| Value::String(call.arguments.clone()));
        Self::new(
            MessageRole::Assistant,
            MessageContent::Parts(vec![ContentPart::FunctionCall {
                name: call.name.clone(),
                args,
                call_id: call.id.clone(),
                thought_signature: call.thought_signature.clone(),
            }]),
        )
    }

    /// Concatenated text of the message (text parts only)
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Structured parts of the message, empty for plain text
    pub fn parts(&self) -> &[ContentPart] {
        match &self.content {
            MessageContent::Text(_) => &[],
            MessageContent::Parts(parts) => parts,
        }
    }

    /// Call ids of every function call part in this message
    pub fn function_call_ids(&self) -> Vec<&str> {
        self.parts()
            .iter()
            .filter_map(|part| match part {
                ContentPart::FunctionCall { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Call ids of every function response part in this message
    pub fn function_response_ids(&self) -> Vec<&str> {
        self.parts()
            .iter()
            .filter_map(|part| match part {
                ContentPart::FunctionResponse { call_id, .. } => Some(call_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Whether this message is part of a tool call/response pair
    pub fn is_tool_exchange(&self) -> bool {
        self.role == MessageRole::Tool
            || !self.function_call_ids().is_empty()
            || !self.function_response_ids().is_empty()
    }
}

/// Why the provider stopped producing output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FinishReason {
    /// Generation finished normally
    Stop,
    /// The model requested tool calls
    ToolCalls,
    /// Mid-stream chunk, nothing to report yet
    #[default]
    Pending,
    /// Provider-native value passed through unchanged
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Pending => "",
            FinishReason::Other(value) => value,
        }
    }

    /// Map a provider-native value; `None` means mid-stream
    pub fn from_native(value: Option<&str>) -> Self {
        match value {
            None | Some("") => FinishReason::Pending,
            Some("stop") => FinishReason::Stop,
            Some("tool_calls") => FinishReason::ToolCalls,
            Some(other) => FinishReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(FinishReason::from_native(value.as_deref()))
    }
}

/// Canonical normalized response chunk or final response
///
/// Every constructor keeps `finish_reason` consistent with `tool_calls`:
/// calls present means `ToolCalls`, and `ToolCalls` without calls degrades
/// to the empty reason. Whether the provider closed the tool round is
/// tracked separately in `ends_tool_round`, since streamed fragments carry
/// calls long before the round is over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text delta (streaming) or full text
    pub content: String,
    /// Tool calls extracted from this response, possibly partial
    pub tool_calls: Vec<ToolCall>,
    /// Normalized finish reason
    pub finish_reason: FinishReason,
    /// The provider signalled that all calls of this round are complete
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ends_tool_round: bool,
    /// Provider payload kept for diagnostics
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub raw_response: Value,
}

impl LlmResponse {
    /// Build a response, normalizing the finish reason against `tool_calls`
    pub fn new(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
        finish_reason: FinishReason,
        raw_response: Value,
    ) -> Self {
        let finish_reason = if !tool_calls.is_empty() {
            FinishReason::ToolCalls
        } else if finish_reason == FinishReason::ToolCalls {
            FinishReason::Pending
        } else {
            finish_reason
        };
        Self {
            content: content.into(),
            tool_calls,
            finish_reason,
            ends_tool_round: false,
            raw_response,
        }
    }

    /// Mark whether the provider closed the tool round with this response
    pub fn with_tool_round_end(mut self, ends: bool) -> Self {
        self.ends_tool_round = ends;
        self
    }

    /// A finished, text-only response
    pub fn text(content: impl Into<String>) -> Self {
        Self::new(content, Vec::new(), FinishReason::Stop, Value::Null)
    }

    /// An empty mid-stream response
    pub fn empty() -> Self {
        Self::new(String::new(), Vec::new(), FinishReason::Pending, Value::Null)
    }

    /// Unparseable payload, kept for diagnostics
    pub fn unrecognized(raw_response: Value) -> Self {
        Self::new(String::new(), Vec::new(), FinishReason::Pending, raw_response)
    }

    /// Whether another tool round is needed
    pub fn requires_tool_call(&self) -> bool {
        !self.tool_calls.is_empty() && self.finish_reason == FinishReason::ToolCalls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_role_alias() {
        let message: LlmMessage =
            serde_json::from_value(json!({"role": "model", "content": "hi"})).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), "hi");
    }

    #[test]
    fn test_parts_serialization() {
        let message = LlmMessage::tool(vec![ContentPart::FunctionResponse {
            name: "get_weather".into(),
            response: FunctionResponsePayload {
                result: json!({"temp": "15C"}),
            },
            call_id: "call_1".into(),
        }]);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(
            value["content"][0]["function_response"]["response"]["result"]["temp"],
            "15C"
        );
        assert_eq!(message.function_response_ids(), vec!["call_1"]);
        assert!(message.is_tool_exchange());
    }

    #[test]
    fn test_function_call_message_keeps_signature() {
        let call = ToolCall::new(0, "call_9", "search", r#"{"q":"rust"}"#)
            .with_thought_signature("sig-abc");
        let message = LlmMessage::function_call(&call);
        match &message.parts()[0] {
            ContentPart::FunctionCall {
                args,
                thought_signature,
                ..
            } => {
                assert_eq!(args["q"], "rust");
                assert_eq!(thought_signature.as_deref(), Some("sig-abc"));
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_function_call_with_broken_arguments() {
        let call = ToolCall::new(0, "call_1", "search", "{\"q\":");
        let message = LlmMessage::function_call(&call);
        match &message.parts()[0] {
            ContentPart::FunctionCall { args, .. } => {
                assert_eq!(args, &Value::String("{\"q\":".into()))
            }
            other => panic!("unexpected part: {:?}", other),
        }
    }

    #[test]
    fn test_finish_reason_invariant() {
        let response = LlmResponse::new("", Vec::new(), FinishReason::ToolCalls, Value::Null);
        assert_eq!(response.finish_reason, FinishReason::Pending);
        assert!(!response.requires_tool_call());

        let call = ToolCall::new(0, "id", "name", "");
        let response = LlmResponse::new("", vec![call.clone()], FinishReason::Stop, Value::Null);
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert!(response.requires_tool_call());
        assert!(!response.ends_tool_round);

        let closing = LlmResponse::new("", Vec::new(), FinishReason::ToolCalls, Value::Null)
            .with_tool_round_end(true);
        assert_eq!(closing.finish_reason, FinishReason::Pending);
        assert!(closing.ends_tool_round);
    }

    #[test]
    fn test_finish_reason_round_trip_strings() {
        assert_eq!(FinishReason::from_native(Some("length")).as_str(), "length");
        assert_eq!(FinishReason::from_native(None), FinishReason::Pending);
        assert_eq!(serde_json::to_value(FinishReason::ToolCalls).unwrap(), "tool_calls");
    }
}

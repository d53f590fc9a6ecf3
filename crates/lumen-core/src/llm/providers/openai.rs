//! OpenAI-compatible chat completion parser
//!
//! Used by: openai, azure, openrouter and other OpenAI-compatible APIs.
//! Accepts a full completion (`choices[].message`), a stream chunk
//! (`choices[].delta`), a single choice, or a bare message object.

use super::ResponseParser;
use crate::llm::messages::{
    ContentPart, FinishReason, FunctionResponsePayload, LlmMessage, LlmResponse,
};
use crate::tools::types::{ToolCall, stringify_result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    choices: Option<Vec<WireChoice>>,
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    delta: Option<WireMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(flatten)]
    bare: WireMessage,
}

#[derive(Debug, Default, Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: Option<WireMessage>,
    #[serde(default)]
    delta: Option<WireMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<WireFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Whether the payload is a complete message rather than a stream delta
enum Shape {
    Complete,
    Delta,
}

fn content_text(content: Option<&Value>) -> String {
    match content {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(parts)) => parts
            .iter()
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join(""),
        _ => String::new(),
    }
}

fn convert_tool_calls(calls: Option<Vec<WireToolCall>>) -> Vec<ToolCall> {
    calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, call)| {
            let function = call.function.unwrap_or_default();
            // Arguments stay raw text; streamed fragments are not valid JSON
            let arguments = match function.arguments {
                Some(Value::String(text)) => text,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            ToolCall {
                index: call.index.unwrap_or(position),
                id: call.id.unwrap_or_default(),
                name: function.name.unwrap_or_default(),
                arguments,
                thought_signature: None,
            }
        })
        .collect()
}

/// Parser for OpenAI-compatible payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiParser;

impl ResponseParser for OpenAiParser {
    fn parse_response(&self, raw: &Value) -> LlmResponse {
        if let Value::String(text) = raw {
            return LlmResponse::text(text.clone());
        }

        let envelope: WireEnvelope = match serde_json::from_value(raw.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("Unrecognized OpenAI payload: {}", e);
                return LlmResponse::unrecognized(raw.clone());
            }
        };

        let (message, finish_reason, shape) = match envelope.choices {
            Some(choices) if !choices.is_empty() => {
                let choice = choices.into_iter().next().unwrap_or_default();
                match (choice.message, choice.delta) {
                    (Some(message), _) => (message, choice.finish_reason, Shape::Complete),
                    (None, Some(delta)) => (delta, choice.finish_reason, Shape::Delta),
                    (None, None) => (WireMessage::default(), choice.finish_reason, Shape::Delta),
                }
            }
            _ => match (envelope.message, envelope.delta) {
                (Some(message), _) => (message, envelope.finish_reason, Shape::Complete),
                (None, Some(delta)) => (delta, envelope.finish_reason, Shape::Delta),
                (None, None) => (envelope.bare, envelope.finish_reason, Shape::Complete),
            },
        };

        let content = content_text(message.content.as_ref());
        let tool_calls = convert_tool_calls(message.tool_calls);
        let finish_reason = FinishReason::from_native(finish_reason.as_deref());

        let native_end = finish_reason == FinishReason::ToolCalls;
        let ends_round = match shape {
            // Complete messages carry whole calls
            Shape::Complete => native_end || !tool_calls.is_empty(),
            // Deltas carry fragments; the round ends on the native reason
            Shape::Delta => native_end,
        };
        LlmResponse::new(content, tool_calls, finish_reason, raw.clone()).with_tool_round_end(ends_round)
    }

    fn create_tool_message(&self, call: &ToolCall, result: &Value) -> LlmMessage {
        // Chat completions only take text tool content
        LlmMessage::tool(vec![ContentPart::FunctionResponse {
            name: call.name.clone(),
            response: FunctionResponsePayload {
                result: Value::String(stringify_result(result)),
            },
            call_id: call.id.clone(),
        }])
    }
}

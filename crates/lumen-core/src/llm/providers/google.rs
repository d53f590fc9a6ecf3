//! Gemini `generateContent` parser
//!
//! Function calls arrive whole inside `parts`, next to optional text parts
//! and an optional `thoughtSignature` that must be echoed back on the next
//! turn.

use super::ResponseParser;
use crate::llm::messages::{
    ContentPart, FinishReason, FunctionResponsePayload, LlmMessage, LlmResponse,
};
use crate::tools::types::ToolCall;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    #[serde(default)]
    candidates: Option<Vec<WireCandidate>>,
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    parts: Option<Vec<WirePart>>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireContent {
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
    #[serde(default)]
    function_call: Option<WireFunctionCall>,
    #[serde(default)]
    thought_signature: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WireFunctionCall {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    args: Option<Value>,
}

/// Parser for Gemini payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct GoogleParser;

impl GoogleParser {
    fn extract(wire: WireResponse) -> (Vec<WirePart>, Option<String>) {
        if let Some(candidate) = wire.candidates.and_then(|c| c.into_iter().next()) {
            let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
            return (parts, candidate.finish_reason);
        }
        let parts = wire
            .content
            .map(|c| c.parts)
            .or(wire.parts)
            .unwrap_or_default();
        (parts, wire.finish_reason)
    }
}

impl ResponseParser for GoogleParser {
    fn parse_response(&self, raw: &Value) -> LlmResponse {
        if let Value::String(text) = raw {
            return LlmResponse::text(text.clone());
        }

        let wire: WireResponse = match serde_json::from_value(raw.clone()) {
            Ok(wire) => wire,
            Err(e) => {
                tracing::debug!("Unrecognized Gemini payload: {}", e);
                return LlmResponse::unrecognized(raw.clone());
            }
        };

        let (parts, native_finish) = Self::extract(wire);
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for part in parts {
            if let Some(function_call) = part.function_call {
                let args = function_call
                    .args
                    .filter(|a| !a.is_null())
                    .unwrap_or_else(|| Value::Object(Default::default()));
                tool_calls.push(ToolCall {
                    index: tool_calls.len(),
                    id: function_call
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
                    name: function_call.name.unwrap_or_default(),
                    arguments: args.to_string(),
                    thought_signature: part.thought_signature,
                });
            } else if let Some(text) = part.text {
                // Thinking summaries are not part of the answer
                if part.thought != Some(true) {
                    content.push_str(&text);
                }
            }
        }

        // Gemini sends each call whole, so any call closes the round
        let ends_round = !tool_calls.is_empty();
        LlmResponse::new(
            content,
            tool_calls,
            FinishReason::from_native(native_finish.as_deref()),
            raw.clone(),
        )
        .with_tool_round_end(ends_round)
    }

    fn create_tool_message(&self, call: &ToolCall, result: &Value) -> LlmMessage {
        // Gemini expects the response as structured data
        LlmMessage::tool(vec![ContentPart::FunctionResponse {
            name: call.name.clone(),
            response: FunctionResponsePayload {
                result: result.clone(),
            },
            call_id: call.id.clone(),
        }])
    }
}

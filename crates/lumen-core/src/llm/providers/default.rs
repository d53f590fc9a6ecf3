//! Canonical passthrough parser
//!
//! Reads payloads already shaped like `LlmResponse`:
//! `{"content": "...", "tool_calls": [{"index", "id", "name", "arguments"}], "finish_reason": "..."}`.

use super::ResponseParser;
use crate::llm::messages::{
    ContentPart, FinishReason, FunctionResponsePayload, LlmMessage, LlmResponse,
};
use crate::tools::types::ToolCall;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
struct CanonicalChunk {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
    #[serde(default)]
    finish_reason: FinishReason,
}

/// Parser for echo and test providers
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl ResponseParser for DefaultParser {
    fn parse_response(&self, raw: &Value) -> LlmResponse {
        if let Value::String(text) = raw {
            return LlmResponse::text(text.clone());
        }

        match serde_json::from_value::<CanonicalChunk>(raw.clone()) {
            Ok(chunk) => {
                // Canonical chunks may carry fragments; only the native reason closes the round
                let ends_round = chunk.finish_reason == FinishReason::ToolCalls;
                LlmResponse::new(
                    chunk.content.unwrap_or_default(),
                    chunk.tool_calls,
                    chunk.finish_reason,
                    raw.clone(),
                )
                .with_tool_round_end(ends_round)
            }
            Err(e) => {
                tracing::debug!("Unrecognized canonical payload: {}", e);
                LlmResponse::unrecognized(raw.clone())
            }
        }
    }

    fn create_tool_message(&self, call: &ToolCall, result: &Value) -> LlmMessage {
        LlmMessage::tool(vec![ContentPart::FunctionResponse {
            name: call.name.clone(),
            response: FunctionResponsePayload {
                result: result.clone(),
            },
            call_id: call.id.clone(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_chunk() {
        let response = DefaultParser.parse_response(&json!({
            "tool_calls": [{"index": 0, "name": "get_weather", "arguments": "{\"city\":"}]
        }));
        assert_eq!(response.tool_calls[0].name, "get_weather");
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert!(!response.ends_tool_round);

        let response = DefaultParser.parse_response(&json!({
            "content": "It's 15C in Paris.", "finish_reason": "stop"
        }));
        assert_eq!(response.content, "It's 15C in Paris.");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn test_closing_chunk_without_calls() {
        let response = DefaultParser.parse_response(&json!({"finish_reason": "tool_calls"}));
        assert!(response.tool_calls.is_empty());
        assert_eq!(response.finish_reason, FinishReason::Pending);
        assert!(response.ends_tool_round);
    }

    #[test]
    fn test_null_finish_reason_is_pending() {
        let response = DefaultParser.parse_response(&json!({"content": "x", "finish_reason": null}));
        assert_eq!(response.finish_reason, FinishReason::Pending);
    }
}

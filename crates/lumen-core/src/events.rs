//! Events streamed to the answer route
//!
//! Serialized with a `type` tag so the HTTP layer can forward them as SSE
//! `data:` payloads verbatim.

use crate::tools::types::{ToolCallRecord, ToolCallStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event of the answer stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text delta of the answer
    Answer { answer: String },
    /// Out-of-band reasoning content, passed through untouched
    Thought { thought: Value },
    /// Tool call progress or outcome
    ToolCalls { data: ToolCallRecord },
    /// Retrieved source documents
    Source { source: Value },
    /// Informational notice (compression happened, ...)
    Info { data: Value },
    /// User-visible error
    Error { error: String },
    /// Conversation identifier
    Id { id: String },
    /// End of stream marker
    End,
}

impl StreamEvent {
    pub fn answer(text: impl Into<String>) -> Self {
        Self::Answer {
            answer: text.into(),
        }
    }

    pub fn info(data: Value) -> Self {
        Self::Info { data }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn tool_call(record: ToolCallRecord) -> Self {
        Self::ToolCalls { data: record }
    }

    /// Status of a tool call event, if this is one
    pub fn tool_status(&self) -> Option<ToolCallStatus> {
        match self {
            Self::ToolCalls { data } => Some(data.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tagged_serialization() {
        let value = serde_json::to_value(StreamEvent::answer("hi")).unwrap();
        assert_eq!(value, json!({"type": "answer", "answer": "hi"}));

        let value = serde_json::to_value(StreamEvent::End).unwrap();
        assert_eq!(value, json!({"type": "end"}));
    }

    #[test]
    fn test_tool_call_event_shape() {
        let record = ToolCallRecord {
            call_id: "c1".into(),
            tool_name: "search".into(),
            arguments: json!({}),
            result: Some("Skipped".into()),
            status: ToolCallStatus::Skipped,
        };
        let event = StreamEvent::tool_call(record);
        assert_eq!(event.tool_status(), Some(ToolCallStatus::Skipped));
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "tool_calls");
        assert_eq!(value["data"]["status"], "skipped");
    }
}

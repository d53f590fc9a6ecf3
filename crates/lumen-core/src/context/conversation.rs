//! Conversation records as seen by compression
//!
//! A conversation is an ordered list of query records. When no persisted
//! conversation exists yet for a turn, one is synthesized from the working
//! message list so compression can run on in-flight work.

use super::compression::CompressionPoint;
use crate::llm::messages::{ContentPart, LlmMessage, MessageRole};
use crate::tools::types::{ToolCallRecord, ToolCallStatus, stringify_result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One prompt with its answer and the tools it used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub prompt: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
}

impl QueryRecord {
    pub fn new(prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            response: response.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(mut self, record: ToolCallRecord) -> Self {
        self.tool_calls.push(record);
        self
    }
}

/// Compression history of a conversation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationCompression {
    pub is_compressed: bool,
    /// One entry per accepted pass, oldest first; only ever appended to
    #[serde(default)]
    pub compression_points: Vec<CompressionPoint>,
    /// Summary produced by the latest pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_summary: Option<String>,
}

impl ConversationCompression {
    pub fn record(&mut self, point: CompressionPoint, summary: impl Into<String>) {
        self.is_compressed = true;
        self.compression_points.push(point);
        self.latest_summary = Some(summary.into());
    }

    pub fn last_point(&self) -> Option<&CompressionPoint> {
        self.compression_points.last()
    }
}

/// Ordered query records plus compression state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub queries: Vec<QueryRecord>,
    #[serde(default)]
    pub compression_metadata: ConversationCompression,
    pub updated_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Query being assembled while replaying messages
#[derive(Default)]
struct PendingQuery {
    prompt: Option<String>,
    response: String,
    tool_calls: Vec<ToolCallRecord>,
}

impl PendingQuery {
    fn is_empty(&self) -> bool {
        self.prompt.is_none() && self.response.is_empty() && self.tool_calls.is_empty()
    }

    fn take(&mut self) -> QueryRecord {
        let pending = std::mem::take(self);
        QueryRecord {
            prompt: pending.prompt.unwrap_or_default(),
            response: pending.response,
            tool_calls: pending.tool_calls,
        }
    }
}

impl Conversation {
    pub fn new(queries: Vec<QueryRecord>) -> Self {
        Self {
            id: None,
            queries,
            compression_metadata: ConversationCompression::default(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Build a conversation by replaying a provider message list
    ///
    /// Each user message opens a query. Function calls are tracked by
    /// `call_id` and completed by their responses. A trailing query without
    /// a response is still kept.
    pub fn from_messages(messages: &[LlmMessage]) -> Self {
        let mut queries = Vec::new();
        let mut pending = PendingQuery::default();

        for message in messages {
            match message.role {
                MessageRole::System => {}
                MessageRole::User => {
                    if !pending.is_empty() {
                        queries.push(pending.take());
                    }
                    pending.prompt = Some(message.text());
                }
                MessageRole::Assistant | MessageRole::Tool => {
                    for part in message.parts() {
                        match part {
                            ContentPart::FunctionCall {
                                name,
                                args,
                                call_id,
                                ..
                            } => pending.tool_calls.push(ToolCallRecord {
                                call_id: call_id.clone(),
                                tool_name: name.clone(),
                                arguments: args.clone(),
                                result: None,
                                status: ToolCallStatus::Pending,
                            }),
                            ContentPart::FunctionResponse {
                                response, call_id, ..
                            } => {
                                if let Some(record) = pending
                                    .tool_calls
                                    .iter_mut()
                                    .find(|r| &r.call_id == call_id)
                                {
                                    record.result = Some(stringify_result(&response.result));
                                    record.status = ToolCallStatus::Completed;
                                }
                            }
                            _ => {}
                        }
                    }
                    if message.role == MessageRole::Assistant {
                        pending.response.push_str(&message.text());
                    }
                }
            }
        }

        if !pending.is_empty() {
            queries.push(pending.take());
        }

        Self::new(queries)
    }

    pub fn is_compressed(&self) -> bool {
        self.compression_metadata.is_compressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::ToolCall;
    use crate::llm::messages::FunctionResponsePayload;
    use serde_json::json;

    fn tool_response(call_id: &str, result: serde_json::Value) -> LlmMessage {
        LlmMessage::tool(vec![ContentPart::FunctionResponse {
            name: "get_weather".into(),
            response: FunctionResponsePayload { result },
            call_id: call_id.into(),
        }])
    }

    #[test]
    fn test_from_messages_splits_on_user() {
        let messages = vec![
            LlmMessage::system("You are helpful"),
            LlmMessage::user("first"),
            LlmMessage::assistant("one"),
            LlmMessage::user("second"),
            LlmMessage::assistant("two"),
        ];
        let conversation = Conversation::from_messages(&messages);
        assert_eq!(
            conversation.queries,
            vec![QueryRecord::new("first", "one"), QueryRecord::new("second", "two")]
        );
        assert!(!conversation.is_compressed());
    }

    #[test]
    fn test_from_messages_pairs_tool_calls_by_id() {
        let call = ToolCall::new(0, "call_1", "get_weather", r#"{"city":"Paris"}"#);
        let messages = vec![
            LlmMessage::system("s"),
            LlmMessage::user("weather in Paris?"),
            LlmMessage::function_call(&call),
            tool_response("call_1", json!({"temp": "15C"})),
            LlmMessage::assistant("It's 15C in Paris."),
        ];
        let conversation = Conversation::from_messages(&messages);
        assert_eq!(conversation.queries.len(), 1);

        let query = &conversation.queries[0];
        assert_eq!(query.response, "It's 15C in Paris.");
        assert_eq!(query.tool_calls.len(), 1);
        assert_eq!(query.tool_calls[0].arguments, json!({"city": "Paris"}));
        assert_eq!(query.tool_calls[0].result.as_deref(), Some(r#"{"temp":"15C"}"#));
        assert_eq!(query.tool_calls[0].status, ToolCallStatus::Completed);
    }

    #[test]
    fn test_unterminated_trailing_query_is_kept() {
        let call = ToolCall::new(0, "call_9", "search", "{}");
        let messages = vec![
            LlmMessage::system("s"),
            LlmMessage::user("done"),
            LlmMessage::assistant("ok"),
            LlmMessage::user("in flight"),
            LlmMessage::function_call(&call),
        ];
        let conversation = Conversation::from_messages(&messages);
        assert_eq!(conversation.queries.len(), 2);

        let last = &conversation.queries[1];
        assert_eq!(last.prompt, "in flight");
        assert_eq!(last.response, "");
        assert_eq!(last.tool_calls[0].status, ToolCallStatus::Pending);
    }

    #[test]
    fn test_system_only_is_empty() {
        let conversation = Conversation::from_messages(&[LlmMessage::system("s")]);
        assert!(conversation.queries.is_empty());
    }

    #[test]
    fn test_compression_history_appends() {
        let mut compression = ConversationCompression::default();
        compression.record(CompressionPoint::new(100, 20, 0), "first");
        compression.record(CompressionPoint::new(120, 30, 2), "second");
        assert!(compression.is_compressed);
        assert_eq!(compression.compression_points.len(), 2);
        assert_eq!(compression.last_point().map(|p| p.compress_up_to_index), Some(2));
        assert_eq!(compression.latest_summary.as_deref(), Some("second"));
    }
}

//! Rebuilding the provider message list after compression
//!
//! The rebuilt list always starts with the single system message and keeps
//! user/assistant alternation outside tool call/response pairs.

use super::conversation::QueryRecord;
use crate::llm::messages::{
    ContentPart, FunctionResponsePayload, LlmMessage, MessageContent, MessageRole,
};
use crate::tools::types::ToolCallStatus;
use serde_json::Value;

/// Marker placed before the live summary block in the system message
pub const SUMMARY_DELIMITER: &str = "\n\n---\n\n## Conversation Summary\n";

const CONTINUE_PROMPT: &str =
    "Please continue with the remaining tasks based on the conversation summary above.";

const MISSING_RESPONSE: &str = "[No response recorded]";

/// Builds message lists from a summary and the queries it does not cover
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageRebuilder;

impl MessageRebuilder {
    /// Rebuild `messages` around a compression summary
    ///
    /// With `include_current_execution`, the messages that follow the
    /// current prompt (the in-flight tool exchanges) are carried over
    /// verbatim. Returns `None` when `messages` has no system message.
    pub fn rebuild_messages_after_compression(
        messages: &[LlmMessage],
        compressed_summary: Option<&str>,
        recent_queries: &[QueryRecord],
        include_current_execution: bool,
        include_tool_calls: bool,
    ) -> Option<Vec<LlmMessage>> {
        let Some(system) = messages.iter().find(|m| m.role == MessageRole::System) else {
            tracing::warn!("Cannot rebuild messages: no system message");
            return None;
        };

        let mut rebuilt = vec![LlmMessage::system(with_summary(
            &system.text(),
            compressed_summary,
        ))];

        let last_user = messages.iter().rposition(|m| m.role == MessageRole::User);
        let current_prompt = last_user.map(|i| messages[i].text());
        let in_flight: Vec<LlmMessage> = messages[last_user.map_or(0, |i| i + 1)..]
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .cloned()
            .collect();

        if recent_queries.is_empty() {
            push_turn(&mut rebuilt, LlmMessage::user(CONTINUE_PROMPT));
            if include_current_execution {
                rebuilt.extend(in_flight);
            }
            return Some(rebuilt);
        }

        let last = recent_queries.len() - 1;
        let mut current_seen = false;

        for (i, query) in recent_queries.iter().enumerate() {
            push_turn(&mut rebuilt, LlmMessage::user(query.prompt.clone()));

            // The in-flight query is replayed from the live messages instead
            if include_current_execution && i == last && current_prompt.as_deref() == Some(&query.prompt) {
                current_seen = true;
                break;
            }

            if include_tool_calls {
                for record in &query.tool_calls {
                    let Some(result) = record
                        .result
                        .as_ref()
                        .filter(|_| record.status != ToolCallStatus::Pending)
                    else {
                        continue;
                    };
                    rebuilt.push(LlmMessage::new(
                        MessageRole::Assistant,
                        MessageContent::Parts(vec![ContentPart::FunctionCall {
                            name: record.tool_name.clone(),
                            args: record.arguments.clone(),
                            call_id: record.call_id.clone(),
                            thought_signature: None,
                        }]),
                    ));
                    rebuilt.push(LlmMessage::tool(vec![ContentPart::FunctionResponse {
                        name: record.tool_name.clone(),
                        response: FunctionResponsePayload {
                            result: Value::String(result.clone()),
                        },
                        call_id: record.call_id.clone(),
                    }]));
                }
            }

            if !query.response.is_empty() {
                rebuilt.push(LlmMessage::assistant(query.response.clone()));
            }
        }

        if include_current_execution {
            if !current_seen {
                if let Some(prompt) = current_prompt {
                    push_turn(&mut rebuilt, LlmMessage::user(prompt));
                }
            }
            rebuilt.extend(in_flight);
        }

        Some(rebuilt)
    }

    /// The live summary block of the system message, if any
    pub fn summary_block(messages: &[LlmMessage]) -> Option<String> {
        let system = messages.iter().find(|m| m.role == MessageRole::System)?.text();
        let (_, summary) = system.split_once(SUMMARY_DELIMITER)?;
        let summary = summary.trim();
        (!summary.is_empty()).then(|| summary.to_string())
    }

    /// Fallback when compression cannot be used
    ///
    /// Keeps the system message and the last user message (plus a plain
    /// assistant reply to it, if any); every tool message is dropped.
    pub fn minimal_prune(messages: &[LlmMessage]) -> Option<Vec<LlmMessage>> {
        let Some(system) = messages.iter().find(|m| m.role == MessageRole::System) else {
            tracing::warn!("Cannot prune messages: no system message");
            return None;
        };

        let mut pruned = vec![system.clone()];
        if let Some(last_user) = messages.iter().rposition(|m| m.role == MessageRole::User) {
            pruned.push(messages[last_user].clone());
            if let Some(reply) = messages[last_user + 1..]
                .iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant && !m.is_tool_exchange())
            {
                pruned.push(reply.clone());
            }
        } else {
            pruned.push(LlmMessage::user(CONTINUE_PROMPT));
        }
        Some(pruned)
    }
}

/// Replace any previous summary block with the new one
fn with_summary(system: &str, summary: Option<&str>) -> String {
    let base = system
        .find(SUMMARY_DELIMITER)
        .map_or(system, |cut| &system[..cut]);
    match summary {
        Some(summary) if !summary.is_empty() => format!("{}{}{}", base, SUMMARY_DELIMITER, summary),
        _ => base.to_string(),
    }
}

/// Push a turn, inserting a placeholder reply where two user turns would meet
fn push_turn(messages: &mut Vec<LlmMessage>, message: LlmMessage) {
    let previous = messages
        .iter()
        .rev()
        .find(|m| !m.is_tool_exchange())
        .map(|m| m.role);
    if message.role == MessageRole::User && previous == Some(MessageRole::User) {
        messages.push(LlmMessage::assistant(MISSING_RESPONSE));
    }
    messages.push(message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::types::{ToolCall, ToolCallRecord};
    use serde_json::json;

    fn in_flight_messages() -> Vec<LlmMessage> {
        let call = ToolCall::new(0, "call_1", "search", r#"{"q":"rust"}"#);
        vec![
            LlmMessage::system("You are helpful"),
            LlmMessage::user("old question"),
            LlmMessage::assistant("old answer"),
            LlmMessage::user("current question"),
            LlmMessage::function_call(&call),
            LlmMessage::tool(vec![ContentPart::FunctionResponse {
                name: "search".into(),
                response: FunctionResponsePayload {
                    result: json!("results"),
                },
                call_id: "call_1".into(),
            }]),
        ]
    }

    /// Roles outside tool exchanges, in order
    fn turn_roles(messages: &[LlmMessage]) -> Vec<MessageRole> {
        messages
            .iter()
            .filter(|m| !m.is_tool_exchange())
            .map(|m| m.role)
            .collect()
    }

    fn assert_alternates(messages: &[LlmMessage]) {
        let roles = turn_roles(messages);
        assert_eq!(roles[0], MessageRole::System);
        assert_eq!(roles.iter().filter(|r| **r == MessageRole::System).count(), 1);
        for (i, role) in roles[1..].iter().enumerate() {
            let expected = if i % 2 == 0 { MessageRole::User } else { MessageRole::Assistant };
            assert_eq!(*role, expected, "roles: {:?}", roles);
        }
    }

    #[test]
    fn test_summary_block_is_replaced() {
        let once = with_summary("Base prompt", Some("first"));
        assert_eq!(once, format!("Base prompt{}first", SUMMARY_DELIMITER));
        let twice = with_summary(&once, Some("second"));
        assert_eq!(twice, format!("Base prompt{}second", SUMMARY_DELIMITER));
        assert_eq!(twice.matches(SUMMARY_DELIMITER).count(), 1);
    }

    #[test]
    fn test_summary_block_read_back() {
        let messages = vec![
            LlmMessage::system(with_summary("Base prompt", Some("first"))),
            LlmMessage::user("next"),
        ];
        assert_eq!(MessageRebuilder::summary_block(&messages).as_deref(), Some("first"));
        assert_eq!(MessageRebuilder::summary_block(&[LlmMessage::system("Base prompt")]), None);
        assert_eq!(MessageRebuilder::summary_block(&[LlmMessage::user("no system")]), None);
    }

    #[test]
    fn test_missing_system_fails() {
        let messages = vec![LlmMessage::user("hi")];
        assert!(
            MessageRebuilder::rebuild_messages_after_compression(&messages, Some("s"), &[], true, true)
                .is_none()
        );
        assert!(MessageRebuilder::minimal_prune(&messages).is_none());
    }

    #[test]
    fn test_empty_recent_injects_continue_prompt() {
        let rebuilt = MessageRebuilder::rebuild_messages_after_compression(
            &in_flight_messages(),
            Some("everything so far"),
            &[],
            true,
            true,
        )
        .unwrap();

        assert!(rebuilt[0].text().ends_with("everything so far"));
        assert_eq!(rebuilt[1].text(), CONTINUE_PROMPT);
        assert_eq!(rebuilt[2].function_call_ids(), vec!["call_1"]);
        assert_eq!(rebuilt[3].function_response_ids(), vec!["call_1"]);
        assert_eq!(rebuilt.len(), 4);
        assert_alternates(&rebuilt);
    }

    #[test]
    fn test_current_query_replayed_from_live_messages() {
        let recent = vec![
            QueryRecord::new("current question", "").with_tool_call(ToolCallRecord {
                call_id: "call_1".into(),
                tool_name: "search".into(),
                arguments: json!({"q": "rust"}),
                result: Some("results".into()),
                status: ToolCallStatus::Completed,
            }),
        ];
        let rebuilt = MessageRebuilder::rebuild_messages_after_compression(
            &in_flight_messages(),
            Some("old stuff"),
            &recent,
            true,
            true,
        )
        .unwrap();

        let call_messages = rebuilt.iter().filter(|m| !m.function_call_ids().is_empty()).count();
        assert_eq!(call_messages, 1);
        assert_eq!(rebuilt[1].text(), "current question");
        assert_eq!(rebuilt.len(), 4);
        assert_alternates(&rebuilt);
    }

    #[test]
    fn test_persisted_recent_then_current_prompt() {
        let recent = vec![QueryRecord::new("old question", "old answer")];
        let rebuilt = MessageRebuilder::rebuild_messages_after_compression(
            &in_flight_messages(),
            Some("summary"),
            &recent,
            true,
            false,
        )
        .unwrap();

        let texts: Vec<String> = rebuilt.iter().map(|m| m.text()).collect();
        assert_eq!(texts[1..4], ["old question", "old answer", "current question"]);
        assert_eq!(rebuilt.len(), 6);
        assert_alternates(&rebuilt);
    }

    #[test]
    fn test_alternation_holds_for_any_recent_list() {
        let record = ToolCallRecord {
            call_id: "c".into(),
            tool_name: "t".into(),
            arguments: json!({}),
            result: Some("r".into()),
            status: ToolCallStatus::Completed,
        };
        let candidates = vec![
            vec![],
            vec![QueryRecord::new("a", "b")],
            vec![QueryRecord::new("a", ""), QueryRecord::new("c", "d")],
            vec![QueryRecord::new("a", "b").with_tool_call(record.clone()), QueryRecord::new("c", "")],
            vec![QueryRecord::new("current question", "")],
        ];

        for recent in &candidates {
            for include_current in [true, false] {
                for include_tools in [true, false] {
                    let rebuilt = MessageRebuilder::rebuild_messages_after_compression(
                        &in_flight_messages(),
                        Some("summary"),
                        recent,
                        include_current,
                        include_tools,
                    )
                    .unwrap();
                    assert_alternates(&rebuilt);
                }
            }
        }
    }

    #[test]
    fn test_pending_tool_records_are_not_replayed() {
        let recent = vec![QueryRecord::new("q", "a").with_tool_call(ToolCallRecord {
            call_id: "c".into(),
            tool_name: "t".into(),
            arguments: json!({}),
            result: None,
            status: ToolCallStatus::Pending,
        })];
        let rebuilt = MessageRebuilder::rebuild_messages_after_compression(
            &in_flight_messages(),
            None,
            &recent,
            false,
            true,
        )
        .unwrap();
        assert!(rebuilt.iter().all(|m| !m.is_tool_exchange()));
        assert_eq!(rebuilt[0].text(), "You are helpful");
    }

    #[test]
    fn test_minimal_prune_drops_tool_messages() {
        let pruned = MessageRebuilder::minimal_prune(&in_flight_messages()).unwrap();
        assert_eq!(pruned.len(), 2);
        assert_eq!(pruned[0].role, MessageRole::System);
        assert_eq!(pruned[1].text(), "current question");
    }
}

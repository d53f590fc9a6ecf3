//! Sequential execution of one batch of tool calls

use super::{LlmHandler, ToolEventStream};
use crate::context::orchestrator::CompressionOrchestrator;
use crate::context::rebuild::MessageRebuilder;
use crate::error::ToolExecutionError;
use crate::events::StreamEvent;
use crate::llm::messages::LlmMessage;
use crate::tools::types::{
    ToolCall, ToolCallRecord, ToolCallStatus, ToolOutput, ToolRegistry, stringify_result,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Result recorded for calls skipped for lack of context
pub const SKIPPED_RESULT: &str =
    "Skipped: Context limit reached. This tool was not executed to avoid exceeding the model's context window.";

enum Step {
    Progress(StreamEvent),
    Done(Result<ToolOutput, ToolExecutionError>),
}

/// Give calls without a provider-issued id a generated one
pub(super) fn assign_missing_ids(mut calls: Vec<ToolCall>) -> Vec<ToolCall> {
    for call in calls.iter_mut().filter(|c| c.id.is_empty()) {
        call.id = format!("call_{}", Uuid::new_v4());
    }
    calls
}

impl LlmHandler {
    /// Run `calls` in order, appending each call/result pair to `messages`
    ///
    /// Before every call the context budget is checked. When it is
    /// exhausted the handler compresses (or prunes) and retries the same
    /// call once; otherwise the remaining calls are reported as skipped and
    /// `context_limit_reached` is left set on the request state.
    #[tracing::instrument(skip_all, fields(
        calls = calls.len(),
        model_id = %self.agent.model_id,
        conversation_id = ?self.agent.conversation_id,
    ))]
    pub fn handle_tool_calls<'a>(
        &'a mut self,
        calls: Vec<ToolCall>,
        tools: &'a ToolRegistry,
        messages: &'a mut Vec<LlmMessage>,
    ) -> ToolEventStream<'a> {
        Box::pin(async_stream::stream! {
            let total = calls.len();
            let mut index = 0;
            let mut compressed_at: Option<usize> = None;

            while index < total {
                let call = &calls[index];

                let limit_reached = self.agent.estimator.check_context_limit(
                    messages,
                    &self.agent.model_id,
                    &mut self.state,
                );

                if limit_reached {
                    // One recovery attempt per call
                    if self.agent.compression_enabled() && compressed_at != Some(index) {
                        compressed_at = Some(index);
                        if let Some((rebuilt, info)) = self.recover_headroom(messages).await {
                            *messages = rebuilt;
                            self.state.reset_context_tracking();
                            yield StreamEvent::info(info);
                            continue;
                        }
                    }

                    if index == 0 {
                        tracing::info!(
                            tokens = self.state.current_token_count,
                            "Context limit reached before executing any tools, skipping {} calls",
                            total
                        );
                    } else {
                        tracing::info!(
                            tokens = self.state.current_token_count,
                            "Context limit reached after executing {} tools, skipping {} calls",
                            index,
                            total - index
                        );
                    }

                    self.state.context_limit_reached = true;
                    for skipped in &calls[index..] {
                        let record = ToolCallRecord::new(
                            skipped,
                            ToolCallStatus::Skipped,
                            Some(SKIPPED_RESULT.to_string()),
                        );
                        self.tool_calls.push(record.clone());
                        yield StreamEvent::tool_call(record);
                    }
                    break;
                }

                let (progress, mut progress_rx) = mpsc::unbounded_channel();
                let invoker = self.agent.tool_invoker.clone();
                let invocation = invoker.execute(tools, call, progress);
                tokio::pin!(invocation);

                let outcome = loop {
                    let step = tokio::select! {
                        biased;
                        Some(event) = progress_rx.recv() => Step::Progress(event),
                        outcome = &mut invocation => Step::Done(outcome),
                    };
                    match step {
                        Step::Progress(event) => yield event,
                        Step::Done(outcome) => break outcome,
                    }
                };
                while let Ok(event) = progress_rx.try_recv() {
                    yield event;
                }

                let (result, status) = match outcome {
                    Ok(output) => {
                        if !output.call_id.is_empty() && output.call_id != call.id {
                            tracing::debug!(
                                "Tool '{}' reported call id '{}' for '{}'",
                                call.name,
                                output.call_id,
                                call.id
                            );
                        }
                        (output.result, ToolCallStatus::Completed)
                    }
                    Err(e) => {
                        tracing::warn!("Tool call '{}' failed: {}", call.name, e);
                        (
                            Value::String(format!("Error executing tool: {}", e)),
                            ToolCallStatus::Error,
                        )
                    }
                };

                messages.push(LlmMessage::function_call(call));
                messages.push(self.parser.create_tool_message(call, &result));

                let record = ToolCallRecord::new(call, status, Some(stringify_result(&result)));
                self.tool_calls.push(record.clone());
                yield StreamEvent::tool_call(record);

                index += 1;
            }
        })
    }

    /// Shrink `messages` so the batch can continue
    ///
    /// Tries summarizing compression first and falls back to pruning down to
    /// the system message and the last user turn.
    async fn recover_headroom(&mut self, messages: &[LlmMessage]) -> Option<(Vec<LlmMessage>, Value)> {
        if let Some(compressor) = self.agent.compressor.clone() {
            let orchestrator = CompressionOrchestrator::new(
                compressor,
                self.agent.store.clone(),
                &self.agent.settings.compression,
            );
            let outcome = orchestrator
                .compress_mid_execution(
                    self.agent.conversation_id.as_deref(),
                    &self.agent.user_id,
                    &self.agent.model_id,
                    messages,
                )
                .await;

            if outcome.success {
                if let Some(rebuilt) = MessageRebuilder::rebuild_messages_after_compression(
                    messages,
                    outcome.compressed_summary.as_deref(),
                    &outcome.recent_queries,
                    true,
                    false,
                ) {
                    let ratio = outcome.metadata.as_ref().map(|m| m.compression_ratio);
                    self.state.compressed_summary = outcome.compressed_summary;
                    self.state.compression_metadata = outcome.metadata;
                    self.state.compression_saved = outcome.persisted;
                    return Some((
                        rebuilt,
                        json!({
                            "message": "Context compressed to continue tool execution",
                            "method": "summary",
                            "compression_ratio": ratio,
                        }),
                    ));
                }
            } else if let Some(error) = outcome.error {
                tracing::warn!("Compression unusable, pruning instead: {}", error);
            }
        }

        let pruned = MessageRebuilder::minimal_prune(messages)?;
        tracing::info!(
            before = messages.len(),
            after = pruned.len(),
            "Pruned messages to continue tool execution"
        );
        Some((
            pruned,
            json!({
                "message": "Context pruned to continue tool execution",
                "method": "prune",
            }),
        ))
    }
}

//! Top-level answer loops
//!
//! Both loops alternate between reading a provider response and running the
//! tool batch it requested, until a response asks for no more tools.

use super::tool_loop::assign_missing_ids;
use super::{EventStream, LlmHandler};
use crate::error::LumenResult;
use crate::events::StreamEvent;
use crate::llm::client::{LlmCallRecord, LlmStream, StreamItem};
use crate::llm::messages::LlmMessage;
use crate::tools::accumulator::ToolCallAccumulator;
use crate::tools::types::{ToolRegistry, ToolSpec};
use futures::StreamExt;
use serde_json::Value;

/// Appended once when tools had to be skipped for lack of context
pub const WRAP_UP_WARNING: &str = "The context window is nearly full, so the remaining tool calls were skipped. \
Do not request any more tools. Answer the user now with the information already gathered.";

impl LlmHandler {
    /// Stream the answer for `initial`, re-invoking the provider after each
    /// tool round
    ///
    /// Text deltas are yielded as soon as they are parsed; thought items are
    /// passed through untouched. Handler state stays inspectable if the
    /// stream is dropped early.
    ///
    /// If the provider stream closes without signalling the end of a tool
    /// round, calls that arrived whole still run; truncated ones are
    /// reported as error events.
    #[tracing::instrument(skip_all, fields(
        provider = %self.kind,
        model_id = %self.agent.model_id,
        conversation_id = ?self.agent.conversation_id,
    ))]
    pub fn handle_streaming<'a>(
        &'a mut self,
        initial: LlmStream,
        tools: &'a ToolRegistry,
        messages: Vec<LlmMessage>,
    ) -> EventStream<'a> {
        Box::pin(async_stream::try_stream! {
            let mut messages = messages;
            let mut stream = initial;

            loop {
                let mut accumulator = ToolCallAccumulator::new();
                let mut batch = None;

                let mut chunks = self.iterate_stream(stream);
                while let Some(item) = chunks.next().await {
                    match item.map_err(|e| e.attributed_to(self.kind.as_str()))? {
                        StreamItem::Thought(thought) => yield StreamEvent::Thought { thought },
                        StreamItem::Chunk(raw) => {
                            let response = self.parse_response(&raw);
                            if !response.content.is_empty() {
                                yield StreamEvent::answer(response.content);
                            }
                            accumulator.merge(&response.tool_calls);
                            if response.ends_tool_round && !accumulator.is_empty() {
                                batch = Some(accumulator.flush());
                                break;
                            }
                        }
                    }
                }
                drop(chunks);

                let calls = match batch {
                    Some(calls) => calls,
                    None if accumulator.is_empty() => break,
                    None => {
                        let (whole, truncated): (Vec<_>, Vec<_>) = accumulator
                            .flush()
                            .into_iter()
                            .partition(|call| !call.name.is_empty() && call.parse_arguments().is_ok());
                        for call in &truncated {
                            tracing::warn!("Stream ended mid tool call '{}' ({}), dropping it", call.name, call.id);
                            yield StreamEvent::error(format!(
                                "Tool call '{}' was cut off before its arguments were complete",
                                call.name
                            ));
                        }
                        if whole.is_empty() {
                            break;
                        }
                        tracing::info!(
                            "Stream ended without closing the tool round, running {} complete calls",
                            whole.len()
                        );
                        whole
                    }
                };

                tracing::debug!("Executing {} tool calls", calls.len());
                {
                    let mut events = self.handle_tool_calls(assign_missing_ids(calls), tools, &mut messages);
                    while let Some(event) = events.next().await {
                        yield event;
                    }
                }

                let specs = self.next_round_tools(&mut messages, tools);
                tracing::debug!(
                    messages = messages.len(),
                    tools_enabled = specs.is_some(),
                    "Re-invoking provider stream"
                );
                self.llm_calls
                    .push(LlmCallRecord::new(messages.len(), specs.is_some(), true));
                stream = self
                    .agent
                    .llm
                    .generate_stream(&messages, specs.as_deref())
                    .await
                    .map_err(|e| e.attributed_to(self.kind.as_str()))?;
            }
        })
    }

    /// Resolve `initial` to the final answer text, running tool rounds in
    /// between
    #[tracing::instrument(skip_all, fields(
        provider = %self.kind,
        model_id = %self.agent.model_id,
        conversation_id = ?self.agent.conversation_id,
    ))]
    pub async fn handle_non_streaming(
        &mut self,
        initial: Value,
        tools: &ToolRegistry,
        messages: Vec<LlmMessage>,
    ) -> LumenResult<String> {
        let mut messages = messages;
        let mut response = self.parse_response(&initial);

        while response.requires_tool_call() {
            let calls = assign_missing_ids(std::mem::take(&mut response.tool_calls));
            {
                let mut events = self.handle_tool_calls(calls, tools, &mut messages);
                while let Some(event) = events.next().await {
                    tracing::trace!(?event, "Tool event");
                }
            }

            let specs = self.next_round_tools(&mut messages, tools);
            tracing::debug!(
                messages = messages.len(),
                tools_enabled = specs.is_some(),
                "Re-invoking provider"
            );
            self.llm_calls
                .push(LlmCallRecord::new(messages.len(), specs.is_some(), false));
            let raw = self
                .agent
                .llm
                .generate(&messages, specs.as_deref())
                .await
                .map_err(|e| e.attributed_to(self.kind.as_str()))?;
            response = self.parse_response(&raw);
        }

        Ok(response.content)
    }

    /// Tools offered on the next provider call
    ///
    /// After a context-limit skip the model gets a one-time warning and no
    /// tools.
    fn next_round_tools(&mut self, messages: &mut Vec<LlmMessage>, tools: &ToolRegistry) -> Option<Vec<ToolSpec>> {
        if self.state.context_limit_reached {
            if !self.wrap_up_sent {
                messages.push(LlmMessage::system(WRAP_UP_WARNING));
                self.wrap_up_sent = true;
            }
            return None;
        }
        (!tools.is_empty()).then(|| tools.specs())
    }
}

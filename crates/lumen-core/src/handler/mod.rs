//! Response handling for one request
//!
//! `LlmHandler` turns provider output into `StreamEvent`s: it normalizes
//! chunks with the provider's `ResponseParser`, accumulates streamed tool
//! calls, runs them one at a time and re-invokes the provider until the
//! model stops asking for tools.

pub mod agent;
pub mod state;
mod streaming;
mod tool_loop;

pub use agent::AgentContext;
pub use state::RequestExecutionState;
pub use tool_loop::SKIPPED_RESULT;

use crate::events::StreamEvent;
use crate::error::LumenResult;
use crate::llm::attachments::Attachment;
use crate::llm::client::{LlmCallRecord, LlmStream};
use crate::llm::messages::{LlmMessage, LlmResponse};
use crate::llm::providers::{ProviderKind, ResponseParser};
use crate::tools::types::{ToolCall, ToolCallRecord};
use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

/// Events produced while answering
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = LumenResult<StreamEvent>> + Send + 'a>>;

/// Events produced while running one tool batch
pub type ToolEventStream<'a> = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'a>>;

/// Per-request handler; never shared between requests
pub struct LlmHandler {
    kind: ProviderKind,
    parser: Box<dyn ResponseParser>,
    agent: AgentContext,
    state: RequestExecutionState,
    llm_calls: Vec<LlmCallRecord>,
    tool_calls: Vec<ToolCallRecord>,
    wrap_up_sent: bool,
}

impl LlmHandler {
    pub fn new(kind: ProviderKind, agent: AgentContext) -> Self {
        Self {
            kind,
            parser: kind.parser(),
            agent,
            state: RequestExecutionState::new(),
            llm_calls: Vec::new(),
            tool_calls: Vec::new(),
            wrap_up_sent: false,
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn agent(&self) -> &AgentContext {
        &self.agent
    }

    /// Provider calls made by this handler, oldest first
    pub fn llm_calls(&self) -> &[LlmCallRecord] {
        &self.llm_calls
    }

    /// Every tool call outcome reported so far, oldest first
    pub fn tool_calls(&self) -> &[ToolCallRecord] {
        &self.tool_calls
    }

    pub fn state(&self) -> &RequestExecutionState {
        &self.state
    }

    pub fn parse_response(&self, raw: &Value) -> LlmResponse {
        self.parser.parse_response(raw)
    }

    pub fn create_tool_message(&self, call: &ToolCall, result: &Value) -> LlmMessage {
        self.parser.create_tool_message(call, result)
    }

    pub fn iterate_stream(&self, stream: LlmStream) -> LlmStream {
        self.parser.iterate_stream(stream)
    }

    /// Fold attachments into `messages` the way the provider accepts them
    pub fn prepare_messages(&self, messages: Vec<LlmMessage>, attachments: &[Attachment]) -> Vec<LlmMessage> {
        if attachments.is_empty() {
            return messages;
        }
        self.agent
            .llm
            .prepare_messages_with_attachments(messages, attachments)
    }
}

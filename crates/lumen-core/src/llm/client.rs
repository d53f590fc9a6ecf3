//! Provider call boundary

use super::attachments::{self, Attachment, PdfRasterizer};
use super::messages::LlmMessage;
use crate::error::LumenResult;
use crate::tools::types::ToolSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

/// One item of a raw provider stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    /// Provider-native chunk, normalized by a `ResponseParser`
    Chunk(Value),
    /// Out-of-band reasoning event, never parsed
    Thought(Value),
}

/// Stream of raw provider items
pub type LlmStream = Pin<Box<dyn Stream<Item = LumenResult<StreamItem>> + Send>>;

/// Provider client used by the handler
///
/// `tools = None` forbids tool use for that call.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Non-streaming completion returning the provider-native response
    async fn generate(&self, messages: &[LlmMessage], tools: Option<&[ToolSpec]>)
    -> LumenResult<Value>;

    /// Streaming completion
    async fn generate_stream(
        &self,
        messages: &[LlmMessage],
        tools: Option<&[ToolSpec]>,
    ) -> LumenResult<LlmStream>;

    /// MIME types the provider accepts natively (`image/png`, `application/pdf`, ...)
    fn supported_attachment_types(&self) -> Vec<String> {
        Vec::new()
    }

    /// Rasterizer used when PDFs must be sent as images
    fn pdf_rasterizer(&self) -> Option<&dyn PdfRasterizer> {
        None
    }

    /// Fold attachments into the message list
    fn prepare_messages_with_attachments(
        &self,
        messages: Vec<LlmMessage>,
        attachments: &[Attachment],
    ) -> Vec<LlmMessage> {
        attachments::prepare_attachments(
            messages,
            attachments,
            &self.supported_attachment_types(),
            self.pdf_rasterizer(),
        )
    }
}

/// Entry of the handler's append-only provider call log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCallRecord {
    pub messages_sent: usize,
    pub tools_enabled: bool,
    pub streaming: bool,
    pub at: DateTime<Utc>,
}

impl LlmCallRecord {
    pub fn new(messages_sent: usize, tools_enabled: bool, streaming: bool) -> Self {
        Self {
            messages_sent,
            tools_enabled,
            streaming,
            at: Utc::now(),
        }
    }
}

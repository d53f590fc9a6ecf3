//! LLM provider boundary, message types and response normalization

pub mod attachments;
pub mod client;
pub mod messages;
pub mod providers;

pub use attachments::{Attachment, PdfRasterizer, RasterizedPage};
pub use client::{LlmCallRecord, LlmClient, LlmStream, StreamItem};
pub use messages::{
    ContentPart, FinishReason, FunctionResponsePayload, LlmMessage, LlmResponse, MessageContent,
    MessageRole,
};
pub use providers::{ProviderKind, ResponseParser};

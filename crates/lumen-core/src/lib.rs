//! Lumen Core Library
//!
//! Answer streaming for retrieval-augmented chat: provider response
//! normalization, streamed tool-call accumulation, sequential tool execution
//! and mid-execution context compression.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod handler;
pub mod llm;
pub mod telemetry;
pub mod tools;

// Re-export commonly used types
pub use config::{CompressionSettings, LoggingConfig, ModelRegistry, Settings};
pub use context::{
    CompressionMetadata, CompressionOrchestrator, ContextLimitEstimator, Conversation,
    ConversationCompressor, ConversationStore, InMemoryConversationStore, LlmCompressor,
    MessageRebuilder, ModelContextEstimator, QueryRecord, TokenEstimator,
};
pub use error::{LumenError, LumenResult, ToolExecutionError};
pub use events::StreamEvent;
pub use handler::{AgentContext, EventStream, LlmHandler, RequestExecutionState};
pub use llm::{
    FinishReason, LlmClient, LlmMessage, LlmResponse, LlmStream, ProviderKind, ResponseParser,
    StreamItem,
};
pub use telemetry::init_logging;
pub use tools::{ToolCall, ToolCallRecord, ToolCallStatus, ToolInvoker, ToolOutput, ToolRegistry, ToolSpec};

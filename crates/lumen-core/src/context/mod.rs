//! Context window management
//!
//! Token estimation, conversation records, LLM-backed compression and the
//! message rebuilding that follows it.

pub mod compression;
pub mod conversation;
pub mod estimator;
pub mod orchestrator;
pub mod rebuild;
pub mod store;

pub use compression::{
    CompressionMetadata, CompressionPoint, ConversationCompressor, LlmCompressor,
};
pub use conversation::{Conversation, ConversationCompression, QueryRecord};
pub use estimator::{ContextLimitEstimator, ModelContextEstimator, TokenEstimator};
pub use orchestrator::{CompressionOrchestrator, MidExecutionCompression};
pub use rebuild::{MessageRebuilder, SUMMARY_DELIMITER};
pub use store::{ConversationStore, InMemoryConversationStore};

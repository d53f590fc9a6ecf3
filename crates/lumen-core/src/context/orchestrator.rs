//! Compression triggered while a tool batch is still running

use super::compression::{CompressionMetadata, ConversationCompressor};
use super::conversation::{Conversation, QueryRecord};
use super::rebuild::MessageRebuilder;
use super::store::ConversationStore;
use crate::config::CompressionSettings;
use crate::llm::messages::LlmMessage;
use std::sync::Arc;

/// Outcome of a mid-execution compression attempt
#[derive(Debug, Clone, Default)]
pub struct MidExecutionCompression {
    /// The summary was accepted and can be used to rebuild messages
    pub success: bool,
    pub compression_performed: bool,
    pub compressed_summary: Option<String>,
    /// Queries not covered by the summary, oldest first
    pub recent_queries: Vec<QueryRecord>,
    pub metadata: Option<CompressionMetadata>,
    /// The compression record reached the conversation store
    pub persisted: bool,
    pub error: Option<String>,
}

impl MidExecutionCompression {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// Runs a compression pass against the persisted or in-flight conversation
pub struct CompressionOrchestrator {
    compressor: Arc<dyn ConversationCompressor>,
    store: Option<Arc<dyn ConversationStore>>,
    recent_queries_to_keep: usize,
}

impl CompressionOrchestrator {
    pub fn new(
        compressor: Arc<dyn ConversationCompressor>,
        store: Option<Arc<dyn ConversationStore>>,
        settings: &CompressionSettings,
    ) -> Self {
        Self {
            compressor,
            store,
            recent_queries_to_keep: settings.recent_queries_to_keep,
        }
    }

    /// Compress everything but the most recent queries
    ///
    /// Falls back to a conversation synthesized from `messages` when nothing
    /// is persisted for `conversation_id`. A pass that does not reduce the
    /// token count is rejected.
    pub async fn compress_mid_execution(
        &self,
        conversation_id: Option<&str>,
        user_id: &str,
        model_id: &str,
        messages: &[LlmMessage],
    ) -> MidExecutionCompression {
        let (mut conversation, persisted_id) = self.load_conversation(conversation_id, user_id, messages).await;

        if conversation.queries.is_empty() {
            return MidExecutionCompression::failed("No queries to compress");
        }

        let total = conversation.queries.len();
        let compress_up_to_index = if total > self.recent_queries_to_keep {
            total - self.recent_queries_to_keep - 1
        } else {
            total - 1
        };

        tracing::info!(
            model_id,
            queries = total,
            compress_up_to_index,
            "Compressing conversation mid-execution"
        );

        let metadata = match self
            .compressor
            .compress_conversation(&conversation, compress_up_to_index)
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Mid-execution compression failed: {}", e);
                return MidExecutionCompression::failed(e.to_string());
            }
        };

        if !metadata.is_reduction() {
            tracing::warn!(
                original = metadata.original_token_count,
                compressed = metadata.compressed_token_count,
                "Compression did not reduce token count, rejecting"
            );
            return MidExecutionCompression {
                metadata: Some(metadata),
                error: Some("Compression did not reduce token count".to_string()),
                ..MidExecutionCompression::default()
            };
        }

        conversation
            .compression_metadata
            .record(metadata.point(), metadata.compressed_summary.clone());
        let (compressed_summary, recent_queries) = self.compressor.get_compressed_context(&conversation);

        let persisted = match persisted_id {
            Some(id) => self.persist(id, &metadata).await,
            None => false,
        };

        tracing::info!(
            ratio = metadata.compression_ratio,
            recent = recent_queries.len(),
            persisted,
            "Mid-execution compression accepted"
        );

        MidExecutionCompression {
            success: true,
            compression_performed: true,
            compressed_summary,
            recent_queries,
            metadata: Some(metadata),
            persisted,
            error: None,
        }
    }

    async fn load_conversation<'a>(
        &self,
        conversation_id: Option<&'a str>,
        user_id: &str,
        messages: &[LlmMessage],
    ) -> (Conversation, Option<&'a str>) {
        if let (Some(store), Some(id)) = (&self.store, conversation_id) {
            match store.get_conversation(id, user_id).await {
                Ok(Some(conversation)) if !conversation.queries.is_empty() => {
                    return (conversation, Some(id));
                }
                Ok(Some(_)) => {
                    tracing::debug!("Conversation '{}' has no queries yet, using in-flight messages", id);
                    return (synthesize(messages), Some(id));
                }
                Ok(None) => tracing::debug!("Conversation '{}' not found, using in-flight messages", id),
                Err(e) => tracing::warn!("Failed to load conversation '{}': {}", id, e),
            }
        }
        (synthesize(messages), None)
    }

    async fn persist(&self, conversation_id: &str, metadata: &CompressionMetadata) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        if let Err(e) = store.append_compression_message(conversation_id, metadata).await {
            tracing::warn!("Failed to save compression message for '{}': {}", conversation_id, e);
            return false;
        }
        if let Err(e) = store.update_compression_metadata(conversation_id, metadata).await {
            tracing::warn!("Failed to update compression metadata for '{}': {}", conversation_id, e);
            return false;
        }
        true
    }
}

/// Conversation built from in-flight messages
///
/// A summary already folded into the system message by an earlier pass is
/// carried as the latest summary, so the next pass extends it.
fn synthesize(messages: &[LlmMessage]) -> Conversation {
    let mut conversation = Conversation::from_messages(messages);
    if let Some(summary) = MessageRebuilder::summary_block(messages) {
        conversation.compression_metadata.is_compressed = true;
        conversation.compression_metadata.latest_summary = Some(summary);
    }
    conversation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::store::MockConversationStore;
    use crate::error::{LumenError, LumenResult};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Compressor returning a summary of fixed length and recording indices
    struct ScriptedCompressor {
        summary: String,
        original_tokens: usize,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedCompressor {
        fn new(summary: &str, original_tokens: usize) -> Arc<Self> {
            Arc::new(Self {
                summary: summary.to_string(),
                original_tokens,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConversationCompressor for ScriptedCompressor {
        async fn compress_conversation(
            &self,
            _conversation: &Conversation,
            compress_up_to_index: usize,
        ) -> LumenResult<CompressionMetadata> {
            self.calls.lock().push(compress_up_to_index);
            Ok(CompressionMetadata::new(
                self.original_tokens,
                self.summary.len(),
                self.summary.clone(),
                compress_up_to_index,
                "test",
            ))
        }
    }

    fn messages() -> Vec<LlmMessage> {
        vec![
            LlmMessage::system("s"),
            LlmMessage::user("q1"),
            LlmMessage::assistant("a1"),
            LlmMessage::user("q2"),
            LlmMessage::assistant("a2"),
            LlmMessage::user("q3"),
        ]
    }

    fn orchestrator(
        compressor: Arc<ScriptedCompressor>,
        store: Option<Arc<dyn ConversationStore>>,
    ) -> CompressionOrchestrator {
        CompressionOrchestrator::new(compressor, store, &CompressionSettings::default())
    }

    #[tokio::test]
    async fn test_synthesized_conversation_keeps_last_query() {
        let compressor = ScriptedCompressor::new("short", 100);
        let result = orchestrator(compressor.clone(), None)
            .compress_mid_execution(None, "u", "gpt-4o", &messages())
            .await;

        assert!(result.success);
        assert!(result.compression_performed);
        assert!(!result.persisted);
        assert_eq!(result.compressed_summary.as_deref(), Some("short"));
        assert_eq!(result.recent_queries, vec![QueryRecord::new("q3", "")]);
        assert_eq!(*compressor.calls.lock(), vec![1]);
    }

    #[tokio::test]
    async fn test_single_query_is_fully_compressed() {
        let compressor = ScriptedCompressor::new("short", 100);
        let only = vec![LlmMessage::system("s"), LlmMessage::user("big")];
        let result = orchestrator(compressor, None)
            .compress_mid_execution(None, "u", "m", &only)
            .await;
        assert!(result.success);
        assert!(result.recent_queries.is_empty());
    }

    #[tokio::test]
    async fn test_non_reduction_is_rejected() {
        let compressor = ScriptedCompressor::new(&"x".repeat(200), 100);
        let result = orchestrator(compressor, None)
            .compress_mid_execution(None, "u", "m", &messages())
            .await;
        assert!(!result.success);
        assert!(!result.compression_performed);
        assert!(result.compressed_summary.is_none());
        assert!(result.metadata.is_some());
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn test_nothing_to_compress() {
        let compressor = ScriptedCompressor::new("s", 100);
        let result = orchestrator(compressor, None)
            .compress_mid_execution(None, "u", "m", &[LlmMessage::system("s")])
            .await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn test_persisted_conversation_is_updated() {
        let mut store = MockConversationStore::new();
        store.expect_get_conversation().returning(|_, _| {
            Ok(Some(Conversation::new(vec![
                QueryRecord::new("p1", "r1"),
                QueryRecord::new("p2", "r2"),
            ])))
        });
        store
            .expect_append_compression_message()
            .times(1)
            .returning(|_, _| Ok(()));
        store
            .expect_update_compression_metadata()
            .withf(|id, metadata| id == "conv-1" && metadata.compress_up_to_index == 0)
            .times(1)
            .returning(|_, _| Ok(()));

        let result = orchestrator(ScriptedCompressor::new("short", 100), Some(Arc::new(store)))
            .compress_mid_execution(Some("conv-1"), "u", "m", &messages())
            .await;

        assert!(result.success);
        assert!(result.persisted);
        assert_eq!(result.recent_queries, vec![QueryRecord::new("p2", "r2")]);
    }

    #[tokio::test]
    async fn test_store_errors_fall_back_to_messages() {
        let mut store = MockConversationStore::new();
        store
            .expect_get_conversation()
            .returning(|_, _| Err(LumenError::storage("down")));
        store.expect_append_compression_message().never();

        let result = orchestrator(ScriptedCompressor::new("short", 100), Some(Arc::new(store)))
            .compress_mid_execution(Some("conv-1"), "u", "m", &messages())
            .await;
        assert!(result.success);
        assert!(!result.persisted);
        assert_eq!(result.recent_queries.len(), 1);
    }
}

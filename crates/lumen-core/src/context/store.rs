//! Conversation persistence boundary

use super::compression::CompressionMetadata;
use super::conversation::Conversation;
use crate::error::{LumenError, LumenResult};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// The few persistence operations compression needs
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Load a conversation owned by `user_id`
    async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> LumenResult<Option<Conversation>>;

    /// Persist a standalone record that compression happened
    async fn append_compression_message(
        &self,
        conversation_id: &str,
        metadata: &CompressionMetadata,
    ) -> LumenResult<()>;

    /// Append a compression point to the conversation's history
    async fn update_compression_metadata(
        &self,
        conversation_id: &str,
        metadata: &CompressionMetadata,
    ) -> LumenResult<()>;
}

#[derive(Debug, Clone)]
struct StoredConversation {
    owner: String,
    conversation: Conversation,
    compression_messages: Vec<CompressionMetadata>,
}

/// Process-local store, used by tests and single-node deployments
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, StoredConversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a conversation
    pub fn insert(&self, conversation_id: impl Into<String>, owner: impl Into<String>, conversation: Conversation) {
        let conversation_id = conversation_id.into();
        let conversation = conversation.with_id(conversation_id.clone());
        self.conversations.write().insert(
            conversation_id,
            StoredConversation {
                owner: owner.into(),
                conversation,
                compression_messages: Vec::new(),
            },
        );
    }

    /// Compression records appended for a conversation, oldest first
    pub fn compression_messages(&self, conversation_id: &str) -> Vec<CompressionMetadata> {
        self.conversations
            .read()
            .get(conversation_id)
            .map(|stored| stored.compression_messages.clone())
            .unwrap_or_default()
    }

    fn missing(conversation_id: &str) -> LumenError {
        LumenError::storage(format!("Conversation '{}' not found", conversation_id))
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_conversation(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> LumenResult<Option<Conversation>> {
        Ok(self
            .conversations
            .read()
            .get(conversation_id)
            .filter(|stored| stored.owner == user_id)
            .map(|stored| stored.conversation.clone()))
    }

    async fn append_compression_message(
        &self,
        conversation_id: &str,
        metadata: &CompressionMetadata,
    ) -> LumenResult<()> {
        let mut conversations = self.conversations.write();
        let stored = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| Self::missing(conversation_id))?;
        stored.compression_messages.push(metadata.clone());
        Ok(())
    }

    async fn update_compression_metadata(
        &self,
        conversation_id: &str,
        metadata: &CompressionMetadata,
    ) -> LumenResult<()> {
        let mut conversations = self.conversations.write();
        let stored = conversations
            .get_mut(conversation_id)
            .ok_or_else(|| Self::missing(conversation_id))?;
        stored
            .conversation
            .compression_metadata
            .record(metadata.point(), metadata.compressed_summary.clone());
        stored.conversation.updated_at = metadata.timestamp;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::conversation::QueryRecord;

    fn store_with_conversation() -> InMemoryConversationStore {
        let store = InMemoryConversationStore::new();
        store.insert(
            "conv-1",
            "alice",
            Conversation::new(vec![QueryRecord::new("hi", "hello")]),
        );
        store
    }

    #[tokio::test]
    async fn test_get_conversation_checks_owner() {
        let store = store_with_conversation();
        let conversation = store.get_conversation("conv-1", "alice").await.unwrap();
        assert_eq!(conversation.and_then(|c| c.id).as_deref(), Some("conv-1"));
        assert!(store.get_conversation("conv-1", "mallory").await.unwrap().is_none());
        assert!(store.get_conversation("nope", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_compression_points_accumulate() {
        let store = store_with_conversation();
        let first = CompressionMetadata::new(100, 20, "first", 0, "m");
        let second = CompressionMetadata::new(150, 30, "second", 0, "m");

        for metadata in [&first, &second] {
            store.append_compression_message("conv-1", metadata).await.unwrap();
            store.update_compression_metadata("conv-1", metadata).await.unwrap();
        }

        let conversation = store.get_conversation("conv-1", "alice").await.unwrap().unwrap();
        assert!(conversation.is_compressed());
        assert_eq!(conversation.compression_metadata.compression_points.len(), 2);
        assert_eq!(
            conversation.compression_metadata.latest_summary.as_deref(),
            Some("second")
        );
        assert_eq!(store.compression_messages("conv-1").len(), 2);
    }

    #[tokio::test]
    async fn test_update_unknown_conversation_fails() {
        let store = InMemoryConversationStore::new();
        let metadata = CompressionMetadata::new(100, 20, "s", 0, "m");
        assert!(matches!(
            store.update_compression_metadata("ghost", &metadata).await,
            Err(LumenError::Storage(_))
        ));
    }
}

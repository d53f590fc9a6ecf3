//! Collaborators and identity of the agent a handler serves

use crate::config::Settings;
use crate::context::compression::ConversationCompressor;
use crate::context::estimator::{ContextLimitEstimator, ModelContextEstimator};
use crate::context::store::ConversationStore;
use crate::llm::client::LlmClient;
use crate::tools::invoker::ToolInvoker;
use std::fmt;
use std::sync::Arc;

/// Everything a handler needs from the surrounding agent
///
/// Cheap to clone; collaborators are shared, per-request state lives on the
/// handler.
#[derive(Clone)]
pub struct AgentContext {
    pub model_id: String,
    pub user_id: String,
    pub conversation_id: Option<String>,
    pub llm: Arc<dyn LlmClient>,
    pub tool_invoker: Arc<dyn ToolInvoker>,
    pub estimator: Arc<dyn ContextLimitEstimator>,
    pub compressor: Option<Arc<dyn ConversationCompressor>>,
    pub store: Option<Arc<dyn ConversationStore>>,
    pub settings: Arc<Settings>,
}

impl AgentContext {
    /// Create a context with the registry-backed estimator from `settings`
    pub fn new(
        model_id: impl Into<String>,
        user_id: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tool_invoker: Arc<dyn ToolInvoker>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            user_id: user_id.into(),
            conversation_id: None,
            llm,
            tool_invoker,
            estimator: Arc::new(ModelContextEstimator::from_settings(&settings)),
            compressor: None,
            store: None,
            settings,
        }
    }

    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn ContextLimitEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn ConversationCompressor>) -> Self {
        self.compressor = Some(compressor);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn compression_enabled(&self) -> bool {
        self.settings.compression.enabled
    }
}

impl fmt::Debug for AgentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentContext")
            .field("model_id", &self.model_id)
            .field("user_id", &self.user_id)
            .field("conversation_id", &self.conversation_id)
            .field("compressor", &self.compressor.is_some())
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

//! Token estimation and context-limit checks
//!
//! Exact tokenization varies by provider, so counts are approximations based
//! on character counts. The estimate is deterministic and monotonic: adding
//! a message never lowers the total.

use crate::config::{ModelRegistry, Settings};
use crate::error::{LumenError, LumenResult};
use crate::handler::state::RequestExecutionState;
use crate::llm::messages::{ContentPart, LlmMessage, MessageContent};

/// Token estimator for LLM messages
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    /// Characters per token (average)
    chars_per_token: f32,
    /// Overhead tokens per message (role, formatting)
    message_overhead: usize,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator {
    /// Create a new token estimator with default settings
    pub fn new() -> Self {
        Self {
            chars_per_token: 4.0,
            message_overhead: 4,
        }
    }

    /// Estimate tokens for a string
    pub fn estimate_string(&self, text: &str) -> usize {
        (text.len() as f32 / self.chars_per_token).ceil() as usize
    }

    /// Estimate tokens for a single message
    ///
    /// Structured parts are serialized to JSON before counting, which is the
    /// shape they take on the wire.
    pub fn estimate_message(&self, message: &LlmMessage) -> LumenResult<usize> {
        let content_tokens = match &message.content {
            MessageContent::Text(text) => self.estimate_string(text),
            MessageContent::Parts(parts) => {
                let mut total = 0;
                for part in parts {
                    total += match part {
                        ContentPart::Text { text } => self.estimate_string(text),
                        other => self.estimate_string(&serde_json::to_string(other)?),
                    };
                }
                total
            }
        };
        Ok(content_tokens + self.message_overhead)
    }

    /// Estimate tokens for a conversation (list of messages)
    pub fn estimate_conversation(&self, messages: &[LlmMessage]) -> LumenResult<usize> {
        messages
            .iter()
            .try_fold(0, |acc, m| Ok(acc + self.estimate_message(m)?))
    }
}

/// Decides whether the working message list still fits the model
///
/// `check_context_limit` fails open: any internal error (unknown model,
/// counting failure) reports "no limit reached".
pub trait ContextLimitEstimator: Send + Sync {
    /// Current token usage of the message list
    fn calculate_current_context_tokens(&self, messages: &[LlmMessage]) -> LumenResult<usize>;

    /// Token budget for the model, already scaled by the threshold
    fn context_budget(&self, model_id: &str) -> LumenResult<usize>;

    /// Whether the budget is exhausted; records the running count on `state`
    fn check_context_limit(
        &self,
        messages: &[LlmMessage],
        model_id: &str,
        state: &mut RequestExecutionState,
    ) -> bool {
        let outcome = self
            .calculate_current_context_tokens(messages)
            .and_then(|tokens| Ok((tokens, self.context_budget(model_id)?)));

        match outcome {
            Ok((tokens, budget)) => {
                state.current_token_count = tokens;
                let reached = tokens >= budget;
                if reached {
                    state.context_limit_reached = true;
                    tracing::debug!(tokens, budget, model_id, "Context limit reached");
                }
                reached
            }
            Err(e) => {
                tracing::warn!("Context limit check failed for '{}', continuing: {}", model_id, e);
                false
            }
        }
    }
}

/// Estimator backed by the model registry and a threshold fraction
#[derive(Debug, Clone)]
pub struct ModelContextEstimator {
    registry: ModelRegistry,
    threshold: f64,
    estimator: TokenEstimator,
}

impl ModelContextEstimator {
    pub fn new(registry: ModelRegistry, threshold: f64) -> Self {
        Self {
            registry,
            threshold,
            estimator: TokenEstimator::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.models.clone(), settings.compression.threshold)
    }

    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }
}

impl ContextLimitEstimator for ModelContextEstimator {
    fn calculate_current_context_tokens(&self, messages: &[LlmMessage]) -> LumenResult<usize> {
        self.estimator.estimate_conversation(messages)
    }

    fn context_budget(&self, model_id: &str) -> LumenResult<usize> {
        let limits = self
            .registry
            .limits_for(model_id)
            .ok_or_else(|| LumenError::config(format!("Unknown model '{}'", model_id)))?;
        Ok((limits.context_window as f64 * self.threshold) as usize)
    }
}

//! LLM-backed conversation compression
//!
//! Older query records are summarized into one text block; the most recent
//! ones stay verbatim.

use super::conversation::{Conversation, QueryRecord};
use super::estimator::TokenEstimator;
use crate::config::CompressionSettings;
use crate::error::{LumenError, LumenResult};
use crate::llm::client::LlmClient;
use crate::llm::messages::LlmMessage;
use crate::llm::providers::{ProviderKind, ResponseParser};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maximum characters of any single field shown to the summarizer
const MAX_FIELD_CHARS: usize = 2000;

/// Entry of a conversation's compression history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionPoint {
    pub at: DateTime<Utc>,
    pub original_token_count: usize,
    pub compressed_token_count: usize,
    /// Queries `0..=compress_up_to_index` are covered by the summary
    pub compress_up_to_index: usize,
}

impl CompressionPoint {
    pub fn new(
        original_token_count: usize,
        compressed_token_count: usize,
        compress_up_to_index: usize,
    ) -> Self {
        Self {
            at: Utc::now(),
            original_token_count,
            compressed_token_count,
            compress_up_to_index,
        }
    }
}

/// Result of one compression pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressionMetadata {
    pub original_token_count: usize,
    pub compressed_token_count: usize,
    /// original / compressed
    pub compression_ratio: f64,
    pub compressed_summary: String,
    pub compress_up_to_index: usize,
    pub model_used: String,
    pub timestamp: DateTime<Utc>,
}

impl CompressionMetadata {
    pub fn new(
        original_token_count: usize,
        compressed_token_count: usize,
        compressed_summary: impl Into<String>,
        compress_up_to_index: usize,
        model_used: impl Into<String>,
    ) -> Self {
        Self {
            original_token_count,
            compressed_token_count,
            compression_ratio: original_token_count as f64 / compressed_token_count.max(1) as f64,
            compressed_summary: compressed_summary.into(),
            compress_up_to_index,
            model_used: model_used.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether the pass strictly reduced the token count
    pub fn is_reduction(&self) -> bool {
        self.compressed_token_count < self.original_token_count
    }

    pub fn point(&self) -> CompressionPoint {
        CompressionPoint {
            at: self.timestamp,
            original_token_count: self.original_token_count,
            compressed_token_count: self.compressed_token_count,
            compress_up_to_index: self.compress_up_to_index,
        }
    }
}

/// Summarizes the older part of a conversation
#[async_trait]
pub trait ConversationCompressor: Send + Sync {
    /// Summarize queries up to and including `compress_up_to_index`
    async fn compress_conversation(
        &self,
        conversation: &Conversation,
        compress_up_to_index: usize,
    ) -> LumenResult<CompressionMetadata>;

    /// Latest summary and the queries it does not cover
    fn get_compressed_context(&self, conversation: &Conversation) -> (Option<String>, Vec<QueryRecord>) {
        let compression = &conversation.compression_metadata;
        match (&compression.latest_summary, compression.last_point()) {
            (Some(summary), Some(point)) => (
                Some(summary.clone()),
                conversation
                    .queries
                    .iter()
                    .skip(point.compress_up_to_index + 1)
                    .cloned()
                    .collect(),
            ),
            _ => (None, conversation.queries.clone()),
        }
    }
}

/// Compressor that asks an LLM for the summary
pub struct LlmCompressor {
    client: Arc<dyn LlmClient>,
    parser: Box<dyn ResponseParser>,
    estimator: TokenEstimator,
    max_summary_tokens: usize,
    model: String,
}

impl LlmCompressor {
    pub fn new(client: Arc<dyn LlmClient>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            client,
            parser: kind.parser(),
            estimator: TokenEstimator::new(),
            max_summary_tokens: 1000,
            model: model.into(),
        }
    }

    /// Summarizer configured from `settings`
    ///
    /// Uses the configured summary model, or `request_model` when none is
    /// set.
    pub fn from_settings(
        client: Arc<dyn LlmClient>,
        kind: ProviderKind,
        settings: &CompressionSettings,
        request_model: &str,
    ) -> Self {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| request_model.to_string());
        Self::new(client, kind, model).with_max_tokens(settings.max_summary_tokens)
    }

    /// Set maximum summary tokens
    pub fn with_max_tokens(mut self, max: usize) -> Self {
        self.max_summary_tokens = max;
        self
    }

    fn build_prompt(&self, previous_summary: Option<&str>, queries: &[QueryRecord]) -> String {
        let previous = previous_summary
            .map(|s| format!("PREVIOUS SUMMARY:\n{}\n\n", truncate(s, MAX_FIELD_CHARS)))
            .unwrap_or_default();

        format!(
            r#"Please summarize the following conversation concisely, preserving:

1. The user's goals and open requests
2. Important tool results and findings
3. Decisions already made and answers already given
4. Any errors encountered

If a previous summary is given, fold it into the new one. Maximum summary length: {} tokens.

---
{}CONVERSATION TO SUMMARIZE:
{}
---

Provide a structured summary:"#,
            self.max_summary_tokens,
            previous,
            format_queries(queries, MAX_FIELD_CHARS)
        )
    }
}

#[async_trait]
impl ConversationCompressor for LlmCompressor {
    async fn compress_conversation(
        &self,
        conversation: &Conversation,
        compress_up_to_index: usize,
    ) -> LumenResult<CompressionMetadata> {
        if compress_up_to_index >= conversation.queries.len() {
            return Err(LumenError::compression(format!(
                "Cannot compress up to query {} of {}",
                compress_up_to_index,
                conversation.queries.len()
            )));
        }

        let previous_summary = conversation.compression_metadata.latest_summary.as_deref();
        let start = conversation
            .compression_metadata
            .last_point()
            .map(|p| p.compress_up_to_index + 1)
            .filter(|start| *start <= compress_up_to_index)
            .unwrap_or(0);
        let queries = &conversation.queries[start..=compress_up_to_index];

        let original_token_count = self.estimator.estimate_string(previous_summary.unwrap_or(""))
            + self
                .estimator
                .estimate_string(&format_queries(queries, usize::MAX));

        let prompt = self.build_prompt(previous_summary, queries);
        let raw = self.client.generate(&[LlmMessage::user(prompt)], None).await?;
        let summary = self.parser.parse_response(&raw).content.trim().to_string();
        if summary.is_empty() {
            return Err(LumenError::compression("Summarizer returned an empty summary"));
        }

        let compressed_token_count = self.estimator.estimate_string(&summary);
        tracing::debug!(
            original_token_count,
            compressed_token_count,
            queries = queries.len(),
            "Conversation summarized"
        );

        Ok(CompressionMetadata::new(
            original_token_count,
            compressed_token_count,
            summary,
            compress_up_to_index,
            self.model.clone(),
        ))
    }
}

/// Render query records as a transcript
fn format_queries(queries: &[QueryRecord], max_chars: usize) -> String {
    queries
        .iter()
        .map(|query| {
            let mut block = format!("USER: {}", truncate(&query.prompt, max_chars));
            for call in &query.tool_calls {
                block.push_str(&format!(
                    "\nTOOL [{}] {} -> {}",
                    call.tool_name,
                    truncate(&call.arguments.to_string(), max_chars),
                    truncate(call.result.as_deref().unwrap_or(""), max_chars)
                ));
            }
            if !query.response.is_empty() {
                block.push_str(&format!("\nASSISTANT: {}", truncate(&query.response, max_chars)));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate content to max characters
fn truncate(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

//! Per-request mutable state shared by the handler, the tool loop and
//! compression

use crate::context::compression::CompressionMetadata;
use serde::{Deserialize, Serialize};

/// State owned by one in-flight request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestExecutionState {
    /// Set when tools were skipped for lack of context; the next provider
    /// call runs without tools
    pub context_limit_reached: bool,
    /// Token count seen by the most recent limit check
    pub current_token_count: usize,
    /// Summary produced by the last accepted compression
    pub compressed_summary: Option<String>,
    pub compression_metadata: Option<CompressionMetadata>,
    /// Whether the compression above already reached the conversation store
    pub compression_saved: bool,
}

impl RequestExecutionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the limit flag and token counter after headroom was recovered
    pub fn reset_context_tracking(&mut self) {
        self.context_limit_reached = false;
        self.current_token_count = 0;
    }

    /// Compression that happened in this request but was not persisted yet
    pub fn unsaved_compression(&self) -> Option<&CompressionMetadata> {
        self.compression_metadata
            .as_ref()
            .filter(|_| !self.compression_saved)
    }
}

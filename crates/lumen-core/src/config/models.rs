//! Model context-window registry

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token limits of a single model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelLimits {
    /// Maximum number of input tokens the model accepts
    pub context_window: usize,
}

impl ModelLimits {
    pub const fn new(context_window: usize) -> Self {
        Self { context_window }
    }
}

/// Lookup table from model id to its limits
///
/// Lookups fall back to the longest registered prefix so dated snapshots
/// (`gpt-4o-2024-08-06`) resolve to their family entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelLimits>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let defaults = [
            ("gpt-4o", 128_000),
            ("gpt-4o-mini", 128_000),
            ("gpt-4.1", 1_047_576),
            ("gpt-4-turbo", 128_000),
            ("gpt-4", 8_192),
            ("gpt-3.5-turbo", 16_385),
            ("o3-mini", 200_000),
            ("gemini-2.5-pro", 1_048_576),
            ("gemini-2.5-flash", 1_048_576),
            ("gemini-2.0-flash", 1_048_576),
            ("gemini-1.5-pro", 2_097_152),
            ("claude-3-5-sonnet", 200_000),
            ("claude-sonnet-4", 200_000),
        ];
        Self {
            models: defaults
                .into_iter()
                .map(|(id, window)| (id.to_string(), ModelLimits::new(window)))
                .collect(),
        }
    }
}

impl ModelRegistry {
    /// Registry with no models
    pub fn empty() -> Self {
        Self {
            models: BTreeMap::new(),
        }
    }

    /// Register or replace a model entry
    pub fn register(&mut self, model_id: impl Into<String>, limits: ModelLimits) {
        self.models.insert(model_id.into(), limits);
    }

    /// Builder-style registration
    pub fn with_model(mut self, model_id: impl Into<String>, context_window: usize) -> Self {
        self.register(model_id, ModelLimits::new(context_window));
        self
    }

    /// Resolve limits for a model id, exact match first then longest prefix
    pub fn limits_for(&self, model_id: &str) -> Option<ModelLimits> {
        if let Some(limits) = self.models.get(model_id) {
            return Some(*limits);
        }
        self.models
            .iter()
            .filter(|(id, _)| model_id.starts_with(id.as_str()))
            .max_by_key(|(id, _)| id.len())
            .map(|(_, limits)| *limits)
    }
}

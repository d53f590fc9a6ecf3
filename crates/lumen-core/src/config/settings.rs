//! Top-level settings

use super::logging_config::LoggingConfig;
use super::models::ModelRegistry;
use serde::{Deserialize, Serialize};

/// Default fraction of the context window at which compression triggers
pub const DEFAULT_COMPRESSION_THRESHOLD: f64 = 0.8;

/// Settings for mid-execution context compression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionSettings {
    /// Whether compression may run when the context limit is hit
    pub enabled: bool,
    /// Fraction of the model's context window treated as the limit
    pub threshold: f64,
    /// Model used by the summarizer (defaults to the request model)
    pub model: Option<String>,
    /// Number of most recent queries kept verbatim after compression
    pub recent_queries_to_keep: usize,
    /// Upper bound for the generated summary
    pub max_summary_tokens: usize,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: DEFAULT_COMPRESSION_THRESHOLD,
            model: None,
            recent_queries_to_keep: 1,
            max_summary_tokens: 1000,
        }
    }
}

impl CompressionSettings {
    /// Enable or disable compression
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the threshold fraction, clamped to `(0, 1]`
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = clamp_threshold(threshold);
        self
    }
}

pub(crate) fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() {
        threshold.clamp(0.01, 1.0)
    } else {
        DEFAULT_COMPRESSION_THRESHOLD
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub compression: CompressionSettings,
    pub models: ModelRegistry,
    pub logging: LoggingConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_defaults() {
        let settings = CompressionSettings::default();
        assert!(settings.enabled);
        assert_eq!(settings.threshold, 0.8);
        assert_eq!(settings.recent_queries_to_keep, 1);
    }

    #[test]
    fn test_threshold_is_clamped() {
        assert_eq!(CompressionSettings::default().with_threshold(3.0).threshold, 1.0);
        assert_eq!(
            CompressionSettings::default().with_threshold(f64::NAN).threshold,
            DEFAULT_COMPRESSION_THRESHOLD
        );
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"compression": {"enabled": false}}"#).unwrap();
        assert!(!settings.compression.enabled);
        assert_eq!(settings.compression.threshold, 0.8);
        assert!(settings.models.limits_for("gpt-4o").is_some());
    }
}

//! Environment variable overrides

use super::logging_config::LoggingConfig;
use super::settings::{Settings, clamp_threshold};
use crate::error::{LumenError, LumenResult};
use std::env;

pub const ENABLE_COMPRESSION_ENV: &str = "LUMEN_ENABLE_CONTEXT_COMPRESSION";
pub const COMPRESSION_THRESHOLD_ENV: &str = "LUMEN_COMPRESSION_THRESHOLD";
pub const COMPRESSION_MODEL_ENV: &str = "LUMEN_COMPRESSION_MODEL";
pub const LOG_LEVEL_ENV: &str = "LUMEN_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "LUMEN_LOG_FORMAT";

/// Apply `LUMEN_*` environment variables on top of loaded settings
pub fn apply_env_overrides(settings: &mut Settings) -> LumenResult<()> {
    apply_overrides_from(settings, |key| env::var(key).ok())
}

/// Apply overrides using an arbitrary variable source
pub fn apply_overrides_from<F>(settings: &mut Settings, lookup: F) -> LumenResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENABLE_COMPRESSION_ENV) {
        settings.compression.enabled = parse_bool(&value).ok_or_else(|| {
            LumenError::config(format!("Invalid {} value: {}", ENABLE_COMPRESSION_ENV, value))
        })?;
    }

    if let Some(value) = lookup(COMPRESSION_THRESHOLD_ENV) {
        let threshold: f64 = value.trim().parse().map_err(|_| {
            LumenError::config(format!(
                "Invalid {} value: {}",
                COMPRESSION_THRESHOLD_ENV, value
            ))
        })?;
        settings.compression.threshold = clamp_threshold(threshold);
    }

    if let Some(model) = lookup(COMPRESSION_MODEL_ENV).filter(|m| !m.trim().is_empty()) {
        settings.compression.model = Some(model);
    }

    // Unset or blank variables leave the loaded values alone
    settings.logging.merge(LoggingConfig {
        level: lookup(LOG_LEVEL_ENV).unwrap_or_default().trim().to_string(),
        format: lookup(LOG_FORMAT_ENV).unwrap_or_default().trim().to_lowercase(),
    });

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

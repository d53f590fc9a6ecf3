//! File-based configuration loading

use super::settings::Settings;
use crate::error::{LumenError, LumenResult};
use std::fs;
use std::path::Path;

/// Load settings from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default settings if the file doesn't exist.
pub fn load_from_file(path: &Path) -> LumenResult<Settings> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        LumenError::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let settings: Settings = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content).map_err(|e| {
            LumenError::config(format!(
                "Failed to parse JSON config '{}': {}",
                path.display(),
                e
            ))
        })?,
    };

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings = load_from_file(&temp_dir.path().join("absent.toml")).unwrap();
        assert!(settings.compression.enabled);
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lumen.toml");
        fs::write(
            &path,
            r#"
[compression]
enabled = false
threshold = 0.6

[models]
"local-llama" = { context_window = 4096 }

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let settings = load_from_file(&path).unwrap();
        assert!(!settings.compression.enabled);
        assert_eq!(settings.compression.threshold, 0.6);
        assert_eq!(
            settings.models.limits_for("local-llama").unwrap().context_window,
            4096
        );
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_load_from_yaml_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lumen.yaml");
        fs::write(&path, "compression:\n  recent_queries_to_keep: 3\n").unwrap();

        let settings = load_from_file(&path).unwrap();
        assert_eq!(settings.compression.recent_queries_to_keep, 3);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("lumen.json");
        fs::write(&path, "{ broken").unwrap();

        let err = load_from_file(&path).unwrap_err();
        assert!(matches!(err, LumenError::Config(_)));
    }
}

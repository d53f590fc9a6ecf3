//! Configuration for the answer engine
//!
//! Settings are loaded once per process (file, then environment overrides)
//! and shared read-only with every request handler.

pub mod env_loader;
pub mod file_loader;
pub mod logging_config;
pub mod models;
pub mod settings;

pub use env_loader::apply_env_overrides;
pub use file_loader::load_from_file;
pub use logging_config::LoggingConfig;
pub use models::{ModelLimits, ModelRegistry};
pub use settings::{CompressionSettings, Settings};

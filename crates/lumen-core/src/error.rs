//! Error types for Lumen

use thiserror::Error;

/// Result type alias for Lumen operations
pub type LumenResult<T> = Result<T, LumenError>;

/// Main error type for the answer engine
///
/// Tool failures, context-limit skips and compression failures are absorbed
/// by the handler and turned into stream events. Only the variants below ever
/// leave `handle_streaming` / `handle_non_streaming`.
#[derive(Error, Debug, Clone)]
pub enum LumenError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM provider errors
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        provider: Option<String>,
    },

    /// Tool execution errors that escaped the per-call guard
    #[error("Tool error: {tool_name}: {message}")]
    Tool { tool_name: String, message: String },

    /// Compression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Conversation storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl LumenError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            provider: None,
        }
    }

    /// Create a new LLM error attributed to a provider
    pub fn llm_with_provider(message: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            provider: Some(provider.into()),
        }
    }

    /// Create a new tool error
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create a new compression error
    pub fn compression(message: impl Into<String>) -> Self {
        Self::Compression(message.into())
    }

    /// Attribute an unattributed LLM error to `provider`
    pub fn attributed_to(self, provider: impl Into<String>) -> Self {
        match self {
            Self::Llm {
                message,
                provider: None,
            } => Self::llm_with_provider(message, provider),
            other => other,
        }
    }

    /// Create a new storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}

impl From<anyhow::Error> for LumenError {
    fn from(error: anyhow::Error) -> Self {
        Self::Other(error.to_string())
    }
}

impl From<std::io::Error> for LumenError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for LumenError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<toml::de::Error> for LumenError {
    fn from(error: toml::de::Error) -> Self {
        Self::Config(format!("Failed to parse TOML config: {}", error))
    }
}

impl From<serde_yaml::Error> for LumenError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Config(format!("Failed to parse YAML config: {}", error))
    }
}

/// Error raised by a single tool invocation
///
/// Never aborts a tool batch: the display string becomes the tool result the
/// model sees.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolExecutionError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments for '{name}': {message}")]
    InvalidArguments { name: String, message: String },

    #[error("Tool '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

impl ToolExecutionError {
    /// Create a failure for the named tool
    pub fn failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<ToolExecutionError> for LumenError {
    fn from(error: ToolExecutionError) -> Self {
        match error {
            ToolExecutionError::NotFound(name) => Self::tool(name, "not found"),
            ToolExecutionError::InvalidArguments { name, message }
            | ToolExecutionError::Failed { name, message } => Self::tool(name, message),
        }
    }
}

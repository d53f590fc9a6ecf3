//! Provider-specific response normalization
//!
//! Each provider family gets one `ResponseParser`. `ProviderKind` is the
//! closed set of families; adding a provider means one new variant and one
//! parser, the handler never branches on provider names.

pub mod default;
pub mod google;
pub mod openai;

use super::client::LlmStream;
use super::messages::{LlmMessage, LlmResponse};
use crate::tools::types::ToolCall;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

pub use default::DefaultParser;
pub use google::GoogleParser;
pub use openai::OpenAiParser;

/// Normalizes one provider's wire format into canonical responses
pub trait ResponseParser: Send + Sync {
    /// Convert a provider-native chunk or response
    ///
    /// Never fails: absent or malformed fields become empty content and no
    /// tool calls. A JSON string is a finished plain-text response.
    fn parse_response(&self, raw: &Value) -> LlmResponse;

    /// Wrap a tool result so it can be appended to the conversation
    fn create_tool_message(&self, call: &ToolCall, result: &Value) -> LlmMessage;

    /// Chunk-level inspection point before normalization
    ///
    /// Out-of-band items (thoughts) must come through untouched.
    fn iterate_stream(&self, stream: LlmStream) -> LlmStream {
        stream
    }
}

/// Provider families with distinct wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    /// OpenAI chat completions and compatible APIs
    OpenAi,
    /// Gemini `generateContent`
    Google,
    /// Canonical passthrough used by echo and test providers
    #[default]
    Default,
}

impl ProviderKind {
    /// Parser for this provider family
    pub fn parser(self) -> Box<dyn ResponseParser> {
        match self {
            ProviderKind::OpenAi => Box::new(OpenAiParser),
            ProviderKind::Google => Box::new(GoogleParser),
            ProviderKind::Default => Box::new(DefaultParser),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Google => "google",
            ProviderKind::Default => "default",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = std::convert::Infallible;

    /// Unknown provider names fall back to `Default`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "openai" | "azure_openai" | "azure" | "openrouter" | "groq" | "novita" => {
                ProviderKind::OpenAi
            }
            "google" | "gemini" | "vertex" => ProviderKind::Google,
            _ => ProviderKind::Default,
        })
    }
}

//! Completion provider contract

use async_trait::async_trait;
use thiserror::Error;

use super::prompt::PromptSpec;

/// Provider failure. `Display` yields only the detail, which is what callers see.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// The request never produced an HTTP response
    #[error("{0}")]
    Transport(String),
    /// The provider answered with an error status
    #[error("{message}")]
    Api { status: u16, message: String },
    /// The provider answered 2xx but without usable text
    #[error("{0}")]
    MalformedResponse(String),
}

impl CompletionError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Api { .. } => "api",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

/// A single round trip to the provider
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a PromptSpec,
    pub max_output_tokens: u32,
}

#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest<'_>) -> Result<String, CompletionError>;
}

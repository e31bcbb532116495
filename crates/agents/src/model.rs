use {async_trait::async_trait, umbra_common::Turn};

use crate::key_pool::Credential;

/// Everything sent to the backend for one attempt.
///
/// Rebuilt from the same history and pending turn on every retry, so the
/// conversation survives a credential change.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    pub system: &'a str,
    pub history: &'a [Turn],
    pub turn: &'a Turn,
}

/// Failure reported by a completion backend.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("response contained no text")]
    EmptyResponse,

    #[error("{0}")]
    Message(String),
}

impl CompletionError {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A generative completion backend.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    fn name(&self) -> &str;

    /// Produce completion text for `request` using `credential`.
    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest<'_>,
    ) -> Result<String, CompletionError>;
}

//! Bounded retry across the credentials of a [`KeyPool`].
//!
//! An exchange is attempted with the active credential. Quota exhaustion
//! rotates to the next credential and retries the same request, at most once
//! per credential. Any other failure ends the exchange immediately.

use std::sync::Arc;

use {
    tracing::{debug, warn},
    umbra_common::Turn,
};

use crate::{
    key_pool::KeyPool,
    model::{CompletionClient, CompletionError, CompletionRequest},
};

/// How a backend error should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Usage allowance of the active credential is spent: rotate and retry.
    QuotaExhausted,
    /// Anything else: surface without retrying.
    Other,
}

const QUOTA_PATTERNS: &[&str] = &[
    "429",
    "quota",
    "resource_exhausted",
    "resource exhausted",
];

/// Classify a backend failure by status code, then by message text.
#[must_use]
pub fn classify_error(err: &CompletionError) -> ProviderErrorKind {
    if let CompletionError::Http { status: 429, .. } = err {
        return ProviderErrorKind::QuotaExhausted;
    }
    if let CompletionError::Request(e) = err
        && e.status().is_some_and(|s| s.as_u16() == 429)
    {
        return ProviderErrorKind::QuotaExhausted;
    }

    let msg = err.to_string().to_lowercase();
    if QUOTA_PATTERNS.iter().any(|p| msg.contains(p)) {
        ProviderErrorKind::QuotaExhausted
    } else {
        ProviderErrorKind::Other
    }
}

/// Outcome of a failed exchange.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("quota exceeded after {attempts} attempt(s): {last}")]
    QuotaExceeded {
        attempts: usize,
        #[source]
        last: CompletionError,
    },

    #[error(transparent)]
    Backend(CompletionError),
}

impl ExchangeError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}

/// Runs one exchange against the backend with quota-driven key rotation.
pub struct RetryOrchestrator {
    pool: Arc<KeyPool>,
    client: Arc<dyn CompletionClient>,
    system_prompt: String,
    rotate_on_success: bool,
}

impl RetryOrchestrator {
    pub fn new(
        pool: Arc<KeyPool>,
        client: Arc<dyn CompletionClient>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            client,
            system_prompt: system_prompt.into(),
            rotate_on_success: false,
        }
    }

    /// Also rotate once after each success, spreading load across keys.
    #[must_use]
    pub fn with_rotate_on_success(mut self, enabled: bool) -> Self {
        self.rotate_on_success = enabled;
        self
    }

    pub fn pool(&self) -> &Arc<KeyPool> {
        &self.pool
    }

    /// Send `history` plus `turn` and return the completion text.
    ///
    /// Makes at most `pool.len()` backend calls, each with a different
    /// credential. Neither argument is modified; the caller records the turns
    /// only after a success.
    pub async fn invoke(&self, history: &[Turn], turn: &Turn) -> Result<String, ExchangeError> {
        let request = CompletionRequest {
            system: &self.system_prompt,
            history,
            turn,
        };
        let mut tried = vec![false; self.pool.len()];
        let (mut index, mut credential) = self.pool.current();
        let mut attempt = 0;

        loop {
            attempt += 1;
            tried[index] = true;
            debug!(
                provider = self.client.name(),
                attempt,
                credential_index = index,
                history_len = history.len(),
                "sending completion request"
            );

            let err = match self.client.complete(credential, &request).await {
                Ok(text) => {
                    if self.rotate_on_success {
                        self.pool.rotate_from(index);
                    }
                    return Ok(text);
                },
                Err(err) => err,
            };

            match classify_error(&err) {
                ProviderErrorKind::QuotaExhausted => {
                    warn!(
                        provider = self.client.name(),
                        attempt,
                        credential_index = index,
                        error = %err,
                        "credential quota exhausted"
                    );
                    // Other exchanges may move the shared cursor meanwhile;
                    // only credentials untried by this exchange are eligible.
                    let Some(next) = self.pool.advance_past(&tried) else {
                        return Err(ExchangeError::QuotaExceeded {
                            attempts: attempt,
                            last: err,
                        });
                    };
                    (index, credential) = next;
                },
                ProviderErrorKind::Other => {
                    warn!(
                        provider = self.client.name(),
                        attempt,
                        credential_index = index,
                        error = %err,
                        "completion failed"
                    );
                    return Err(ExchangeError::Backend(err));
                },
            }
        }
    }
}

//! Completion side of an exchange: credential rotation, bounded retry on quota
//! exhaustion, the image directive embedded in replies, and the Gemini
//! provider.

pub mod directive;
pub mod error;
pub mod key_pool;
pub mod model;
pub mod provider_chain;
pub mod providers;

pub use {
    directive::{DirectiveParse, parse_directive},
    error::{Error, Result},
    key_pool::{Credential, KeyPool},
    model::{CompletionClient, CompletionError, CompletionRequest},
    provider_chain::{ExchangeError, ProviderErrorKind, RetryOrchestrator, classify_error},
};

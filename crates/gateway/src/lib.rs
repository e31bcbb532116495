//! Chat gateway: runs each inbound message through the full exchange.
//!
//! Inbound message → user history → completion (with key rotation) →
//! history append → directive extraction → chunked reply and optional image →
//! background snapshot save.

pub mod chat;
pub mod chat_error;

pub use {
    chat::{ChatService, ChatSettings},
    chat_error::{IMAGE_FAILED_MESSAGE, QUOTA_EXCEEDED_MESSAGE, user_facing_error},
};

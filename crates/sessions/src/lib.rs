//! Conversation state and its durable snapshot.
//!
//! [`SessionStore`] keeps every user's history in memory for the lifetime of
//! the process. [`PersistenceGateway`] projects it to a text-only
//! [`PersistedSnapshot`] and keeps a single pinned copy in a
//! [`DurableChannel`].

pub mod error;
pub mod persistence;
pub mod snapshot;
pub mod store;

pub use {
    error::{Error, Result},
    persistence::{DocumentHandle, DurableChannel, PersistenceGateway},
    snapshot::{PersistedSnapshot, PersistedTurn},
    store::{ConversationHistory, SessionStore, SharedSessionStore},
};

//! Transport boundary.
//!
//! A chat transport (Telegram today) turns platform updates into
//! [`InboundEnvelope`]s for an [`InboundHandler`] and implements
//! [`ChannelOutbound`] so replies can be sent back.

pub mod chunk;
pub mod error;
pub mod plugin;

pub use {
    chunk::{DEFAULT_CHUNK_CHARS, chunk_text},
    error::{Error, Result},
    plugin::{
        ChannelOutbound, ChatAction, InboundEnvelope, InboundHandler, InboundMessage, SentMessage,
    },
};

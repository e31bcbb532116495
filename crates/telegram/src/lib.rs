//! Telegram transport: long polling, inbound extraction, outbound sends, and
//! a channel-backed document store for conversation snapshots.

pub mod bot;
pub mod config;
pub mod durable;
pub mod error;
pub mod handlers;
pub mod outbound;

pub use {
    bot::{build_bot, connect, start_polling},
    config::TelegramBotConfig,
    durable::TelegramDurableChannel,
    error::{Error, Result},
    outbound::TelegramOutbound,
    teloxide::Bot,
};

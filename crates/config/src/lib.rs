//! Configuration loading, env substitution and startup validation.
//!
//! Config files: `umbra.toml`, `umbra.yaml`, or `umbra.json`, searched in
//! `./` then `~/.config/umbra/`. Environment variables (`TELEGRAM_TOKEN`,
//! `GEMINI_API_KEY`, `DB_CHANNEL_ID`, `GEMINI_MODEL`) override file values.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load, load_config},
    schema::{
        ChatConfig, ImageConfig, PersistenceConfig, ProviderConfig, TelegramConfig, UmbraConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, ensure_startable, validate},
};

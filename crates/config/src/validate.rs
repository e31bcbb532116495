//! Startup validation of the resolved configuration.

use std::fmt;

use {secrecy::ExposeSecret, url::Url};

use crate::{
    error::{Error, Result},
    schema::UmbraConfig,
};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "provider.api_keys".
    pub path: &'static str,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check a resolved config and collect every problem found.
pub fn validate(cfg: &UmbraConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    if cfg.telegram.token.expose_secret().trim().is_empty() {
        result.push(Severity::Error, "telegram.token", "bot token is missing");
    }

    let keys = cfg.provider.usable_keys();
    match keys.len() {
        0 => result.push(Severity::Error, "provider.api_keys", "no API key configured"),
        1 => result.push(
            Severity::Info,
            "provider.api_keys",
            "single API key: quota errors cannot be rotated around",
        ),
        _ => {},
    }

    if Url::parse(&cfg.provider.base_url).is_err() {
        result.push(
            Severity::Error,
            "provider.base_url",
            format!("not a valid URL: {}", cfg.provider.base_url),
        );
    }

    if cfg.image.enabled && Url::parse(&cfg.image.base_url).is_err() {
        result.push(
            Severity::Error,
            "image.base_url",
            format!("not a valid URL: {}", cfg.image.base_url),
        );
    }

    if cfg.chat.reply_chunk_chars == 0 {
        result.push(
            Severity::Error,
            "chat.reply_chunk_chars",
            "chunk size must be greater than zero",
        );
    }

    if !cfg.persistence.is_enabled() {
        result.push(
            Severity::Info,
            "persistence.channel_id",
            "no channel configured: conversation history will not survive restarts",
        );
    }

    if !cfg.chat.system_prompt_file.exists() {
        result.push(
            Severity::Warning,
            "chat.system_prompt_file",
            format!(
                "{} not found, the fallback prompt will be used",
                cfg.chat.system_prompt_file.display()
            ),
        );
    }

    result
}

/// Fail fast on the conditions that must stop the process before serving.
pub fn ensure_startable(cfg: &UmbraConfig) -> Result<()> {
    if cfg.telegram.token.expose_secret().trim().is_empty() {
        return Err(Error::MissingTelegramToken);
    }
    if cfg.provider.usable_keys().is_empty() {
        return Err(Error::NoApiKeys);
    }
    if cfg.chat.reply_chunk_chars == 0 {
        return Err(Error::message("chat.reply_chunk_chars must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn startable() -> UmbraConfig {
        let mut cfg = UmbraConfig::default();
        cfg.telegram.token = Secret::new("123:ABC".into());
        cfg.provider.api_keys = vec![Secret::new("k1".into()), Secret::new("k2".into())];
        cfg
    }

    #[test]
    fn missing_token_is_fatal() {
        let mut cfg = startable();
        cfg.telegram.token = Secret::new("   ".into());
        assert!(matches!(
            ensure_startable(&cfg),
            Err(Error::MissingTelegramToken)
        ));
        assert!(validate(&cfg).has_errors());
    }

    #[test]
    fn blank_keys_are_fatal() {
        let mut cfg = startable();
        cfg.provider.api_keys = vec![Secret::new(" ".into())];
        assert!(matches!(ensure_startable(&cfg), Err(Error::NoApiKeys)));
    }

    #[test]
    fn missing_channel_is_informational() {
        let cfg = startable();
        assert!(ensure_startable(&cfg).is_ok());
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.path == "persistence.channel_id" && d.severity == Severity::Info)
        );
    }

    #[test]
    fn invalid_base_url_reported() {
        let mut cfg = startable();
        cfg.provider.base_url = "not a url".into();
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 1);
    }
}

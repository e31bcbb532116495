use secrecy::Secret;

/// Connection settings for the bot.
#[derive(Clone)]
pub struct TelegramBotConfig {
    /// Bot token from @BotFather.
    pub token: Secret<String>,
    /// Long-poll timeout passed to `getUpdates`.
    pub poll_timeout_secs: u32,
}

impl TelegramBotConfig {
    pub fn new(token: Secret<String>) -> Self {
        Self {
            token,
            poll_timeout_secs: 30,
        }
    }
}

impl std::fmt::Debug for TelegramBotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramBotConfig")
            .field("token", &"[REDACTED]")
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let cfg = TelegramBotConfig::new(Secret::new("123:SECRET".into()));
        let dbg = format!("{cfg:?}");
        assert!(!dbg.contains("SECRET"));
        assert!(dbg.contains("poll_timeout_secs: 30"));
    }
}

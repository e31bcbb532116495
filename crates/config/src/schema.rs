/// Config schema types (telegram, provider, chat, image, persistence).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
    tracing::{debug, warn},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UmbraConfig {
    pub telegram: TelegramConfig,
    pub provider: ProviderConfig,
    pub chat: ChatConfig,
    pub image: ImageConfig,
    pub persistence: PersistenceConfig,
}

/// Transport settings for the Telegram bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Required; the process refuses to start without it.
    #[serde(serialize_with = "serialize_redacted")]
    pub token: Secret<String>,
    /// Long-polling timeout passed to `getUpdates`, in seconds.
    pub poll_timeout_secs: u32,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            poll_timeout_secs: 30,
        }
    }
}

/// Completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API keys rotated round-robin when one runs out of quota.
    #[serde(serialize_with = "serialize_redacted_list")]
    pub api_keys: Vec<Secret<String>>,
    /// Model ID, e.g. "gemini-2.5-flash".
    pub model: String,
    /// API base URL (override for proxies and tests).
    pub base_url: String,
    pub max_output_tokens: u32,
    /// Advance to the next key after every successful exchange to spread load.
    pub rotate_on_success: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            max_output_tokens: 8192,
            rotate_on_success: true,
        }
    }
}

impl ProviderConfig {
    /// Keys with surrounding whitespace removed; blank entries are dropped.
    pub fn usable_keys(&self) -> Vec<Secret<String>> {
        self.api_keys
            .iter()
            .map(|k| k.expose_secret().trim())
            .filter(|k| !k.is_empty())
            .map(|k| Secret::new(k.to_string()))
            .collect()
    }
}

/// Conversation behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// File holding the system instructions (knowledge base).
    pub system_prompt_file: PathBuf,
    /// Used when `system_prompt_file` cannot be read.
    pub fallback_system_prompt: String,
    /// Sent alongside an image that arrives without a caption.
    pub default_image_prompt: String,
    /// Reply to `/start`.
    pub greeting: String,
    /// Replies longer than this many characters are sent in slices.
    pub reply_chunk_chars: usize,
    /// Maximum characters of backend error detail shown to the user.
    pub error_detail_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt_file: PathBuf::from("knowledge_base.txt"),
            fallback_system_prompt: "You are Umbra.".into(),
            default_image_prompt: "What do you see in this image? Analyze it in your own style."
                .into(),
            greeting: "I am Umbra.\nI hear you, I see you, and I give shape to your ideas.".into(),
            reply_chunk_chars: 4000,
            error_detail_chars: 100,
        }
    }
}

impl ChatConfig {
    /// Read the system instructions, falling back to the built-in prompt.
    pub fn load_system_prompt(&self) -> String {
        match std::fs::read_to_string(&self.system_prompt_file) {
            Ok(text) if !text.trim().is_empty() => {
                debug!(path = %self.system_prompt_file.display(), "loaded system prompt");
                text
            },
            Ok(_) => {
                warn!(path = %self.system_prompt_file.display(), "system prompt file is empty, using fallback");
                self.fallback_system_prompt.clone()
            },
            Err(e) => {
                warn!(
                    path = %self.system_prompt_file.display(),
                    error = %e,
                    "system prompt file not readable, using fallback"
                );
                self.fallback_system_prompt.clone()
            },
        }
    }
}

/// Out-of-band image generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,
    pub width: u32,
    pub height: u32,
    /// Prepended to every generation prompt.
    pub style_prefix: String,
    /// Shown while an image is being generated; deleted afterwards.
    pub placeholder_text: String,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://image.pollinations.ai".into(),
            model: "flux".into(),
            width: 1024,
            height: 1024,
            style_prefix: "dark atmosphere, gloomy, hyperrealistic, 8k, cinematic lighting".into(),
            placeholder_text: "Summoning the image...".into(),
        }
    }
}

/// Snapshot persistence in a Telegram channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Channel holding the pinned snapshot. `None` disables persistence.
    pub channel_id: Option<String>,
    pub file_name: String,
    pub caption: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            channel_id: None,
            file_name: "umbra_backup.json".into(),
            caption: "Umbra Memory".into(),
        }
    }
}

impl PersistenceConfig {
    pub fn is_enabled(&self) -> bool {
        self.channel_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }
}

fn serialize_redacted<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if secret.expose_secret().is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("[REDACTED]")
    }
}

fn serialize_redacted_list<S: serde::Serializer>(
    secrets: &[Secret<String>],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(secrets.iter().map(|_| "[REDACTED]"))
}

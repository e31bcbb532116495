use {async_trait::async_trait, umbra_common::UserId};

use crate::error::Result;

// ── Inbound ─────────────────────────────────────────────────────────────────

/// Payload of an inbound user message.
#[derive(Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Text(String),
    /// A photo, already downloaded, with its optional caption.
    Image {
        data: Vec<u8>,
        media_type: String,
        caption: Option<String>,
    },
    /// A slash command such as `/start` (name without the slash, lowercased).
    Command { name: String, args: String },
}

impl std::fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(&text.len()).finish(),
            Self::Image {
                data,
                media_type,
                caption,
            } => f
                .debug_struct("Image")
                .field("bytes", &data.len())
                .field("media_type", media_type)
                .field("has_caption", &caption.is_some())
                .finish(),
            Self::Command { name, .. } => f.debug_struct("Command").field("name", name).finish(),
        }
    }
}

impl InboundMessage {
    /// Parse a plain text message, recognising `/command args` forms.
    ///
    /// Commands addressed to a bot (`/start@my_bot`) lose the suffix.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if let Some(rest) = text.strip_prefix('/') {
            let (head, args) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(h, a)| (h, a.trim()));
            let name = head.split('@').next().unwrap_or(head);
            if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Self::Command {
                    name: name.to_ascii_lowercase(),
                    args: args.to_string(),
                };
            }
        }
        Self::Text(text)
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

/// An inbound message together with its routing information.
#[derive(Debug, Clone)]
pub struct InboundEnvelope {
    /// Identity owning the conversation history.
    pub user_id: UserId,
    /// Where replies go.
    pub chat_id: String,
    pub sender_name: Option<String>,
    pub message: InboundMessage,
}

/// Receives inbound messages from a transport. The gateway implements this.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Process one message to completion. Errors are reported to the user by
    /// the handler itself; nothing is returned to the transport.
    async fn handle(&self, inbound: InboundEnvelope);
}

// ── Outbound ────────────────────────────────────────────────────────────────

/// Reference to a message the transport has delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: String,
    pub message_id: String,
}

/// Chat activity hint shown while a reply is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    Typing,
    UploadPhoto,
}

/// Send messages to a chat.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<SentMessage>;

    /// Send a photo the platform fetches from `url`.
    async fn send_photo_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
    ) -> Result<SentMessage>;

    async fn delete_message(&self, to: &str, message_id: &str) -> Result<()>;

    /// Show an activity indicator. No-op by default.
    async fn send_chat_action(&self, _to: &str, _action: ChatAction) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("/start", "start", "")]
    #[case("/START", "start", "")]
    #[case("/start@umbra_bot", "start", "")]
    #[case("/draw  a red fox ", "draw", "a red fox")]
    fn parses_commands(#[case] input: &str, #[case] name: &str, #[case] args: &str) {
        assert_eq!(
            InboundMessage::from_text(input),
            InboundMessage::Command {
                name: name.into(),
                args: args.into(),
            }
        );
    }

    #[rstest]
    #[case("hello")]
    #[case("/")]
    #[case("/ not a command")]
    #[case("//IMG: looks like a path")]
    fn plain_text_stays_text(#[case] input: &str) {
        assert_eq!(
            InboundMessage::from_text(input),
            InboundMessage::Text(input.into())
        );
    }

    #[test]
    fn image_debug_omits_bytes() {
        let msg = InboundMessage::Image {
            data: vec![7; 10],
            media_type: "image/jpeg".into(),
            caption: Some("secret caption".into()),
        };
        let dbg = format!("{msg:?}");
        assert!(dbg.contains("bytes: 10"));
        assert!(!dbg.contains("secret caption"));
    }
}

//! Conversation primitives shared by the session store, the completion
//! providers and the transport layer.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a conversation partner (stringified platform user id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Speaker of a turn.
///
/// The wire names follow the completion backend: the assistant side is
/// called `"model"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "model")]
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "model",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One part of a turn.
///
/// Image parts only live in memory for the duration of the process; they are
/// never written to a snapshot.
#[derive(Clone, PartialEq, Eq)]
pub enum ContentPart {
    Text(String),
    Image { media_type: String, data: Vec<u8> },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn image(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Image {
            media_type: media_type.into(),
            data,
        }
    }

    /// Text payload, or `None` for binary parts.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

impl fmt::Debug for ContentPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Image { media_type, data } => f
                .debug_struct("Image")
                .field("media_type", media_type)
                .field("bytes", &data.len())
                .finish(),
        }
    }
}

/// One message unit in a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub parts: Vec<ContentPart>,
}

impl Turn {
    pub fn new(role: Role, parts: Vec<ContentPart>) -> Self {
        Self { role, parts }
    }

    pub fn user(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, parts)
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![ContentPart::text(text)])
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentPart::text(text)])
    }

    /// Iterate over the text parts only, in order.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(ContentPart::as_text)
    }

    pub fn has_image(&self) -> bool {
        self.parts.iter().any(ContentPart::is_image)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"model\"");
        let role: Role = serde_json::from_str("\"model\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn text_parts_skip_images() {
        let turn = Turn::user(vec![
            ContentPart::image("image/jpeg", vec![1, 2, 3]),
            ContentPart::text("what is this?"),
        ]);
        assert!(turn.has_image());
        assert_eq!(turn.text_parts().collect::<Vec<_>>(), vec!["what is this?"]);
    }

    #[test]
    fn image_debug_hides_bytes() {
        let part = ContentPart::image("image/png", vec![0; 2048]);
        let dbg = format!("{part:?}");
        assert!(dbg.contains("2048"));
        assert!(!dbg.contains("0, 0"));
    }

    #[test]
    fn user_id_from_numeric() {
        assert_eq!(UserId::from(42_i64).as_str(), "42");
        assert_eq!(UserId::from("-100").to_string(), "-100");
    }
}

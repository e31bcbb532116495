//! Text-only projection of a [`SessionStore`] and its JSON form.
//!
//! Document shape, keyed by stringified user id:
//!
//! ```json
//! { "1234": [ { "role": "user", "parts": ["hi"] },
//!             { "role": "model", "parts": ["hello"] } ] }
//! ```
//!
//! There is no version field.

use std::collections::BTreeMap;

use {
    serde::{Deserialize, Serialize},
    umbra_common::{ContentPart, Role, Turn, UserId},
};

use crate::{
    error::Result,
    store::{ConversationHistory, SessionStore},
};

/// One persisted turn. Parts are plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedTurn {
    pub role: Role,
    pub parts: Vec<String>,
}

/// Every user's text-only history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedSnapshot {
    users: BTreeMap<String, Vec<PersistedTurn>>,
}

impl PersistedSnapshot {
    /// Project `store` to text. Image and empty text parts are dropped; a
    /// turn left without any text is dropped entirely.
    pub fn from_store(store: &SessionStore) -> Self {
        let users = store
            .iter()
            .map(|(user_id, history)| {
                let turns = history
                    .turns()
                    .iter()
                    .filter_map(|turn| {
                        let parts: Vec<String> = turn
                            .text_parts()
                            .filter(|text| !text.is_empty())
                            .map(str::to_owned)
                            .collect();
                        (!parts.is_empty()).then_some(PersistedTurn {
                            role: turn.role,
                            parts,
                        })
                    })
                    .collect();
                (user_id.to_string(), turns)
            })
            .collect();
        Self { users }
    }

    /// Rebuild a store with one session per persisted user.
    pub fn restore(self) -> SessionStore {
        let mut store = SessionStore::new();
        for (user_id, turns) in self.users {
            let history: ConversationHistory = turns
                .into_iter()
                .map(|t| Turn::new(t.role, t.parts.into_iter().map(ContentPart::Text).collect()))
                .collect::<Vec<_>>()
                .into();
            *store.get_or_create(&UserId::from(user_id)) = history;
        }
        store
    }

    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    pub fn turn_count(&self) -> usize {
        self.users.values().map(Vec::len).sum()
    }

    pub fn turns(&self, user_id: &str) -> Option<&[PersistedTurn]> {
        self.users.get(user_id).map(Vec::as_slice)
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use umbra_common::{Turn, UserId};

/// Store shared between the serving path and background saves.
pub type SharedSessionStore = Arc<RwLock<SessionStore>>;

/// Ordered, append-only turns of one user's conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl From<Vec<Turn>> for ConversationHistory {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}

/// In-memory mapping from user to conversation history.
///
/// No internal locking: callers serialize access to the same user and wrap the
/// store in a lock when it is shared (see [`SharedSessionStore`]).
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: HashMap<UserId, ConversationHistory>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a store for sharing across tasks.
    pub fn shared(self) -> SharedSessionStore {
        Arc::new(RwLock::new(self))
    }

    /// Existing history for `user_id`, or a fresh empty one.
    pub fn get_or_create(&mut self, user_id: &UserId) -> &mut ConversationHistory {
        self.sessions.entry(user_id.clone()).or_default()
    }

    pub fn append(&mut self, user_id: &UserId, turn: Turn) {
        self.get_or_create(user_id).push(turn);
    }

    /// Swap the entire map for `other`. Used when restoring a snapshot.
    pub fn replace_all(&mut self, other: SessionStore) {
        self.sessions = other.sessions;
    }

    pub fn history(&self, user_id: &UserId) -> Option<&ConversationHistory> {
        self.sessions.get(user_id)
    }

    /// Cloned turns for `user_id`, empty when the user is unknown.
    pub fn turns_for(&self, user_id: &UserId) -> Vec<Turn> {
        self.history(user_id)
            .map(|h| h.turns().to_vec())
            .unwrap_or_default()
    }

    pub fn users(&self) -> impl Iterator<Item = &UserId> {
        self.sessions.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UserId, &ConversationHistory)> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_create_is_lazy_and_stable() {
        let mut store = SessionStore::new();
        let alice = UserId::from(1_i64);
        assert!(store.history(&alice).is_none());

        assert!(store.get_or_create(&alice).is_empty());
        store.get_or_create(&alice).push(Turn::user_text("hi"));
        assert_eq!(store.get_or_create(&alice).len(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn append_preserves_order() {
        let mut store = SessionStore::new();
        let user = UserId::from("42");
        store.append(&user, Turn::user_text("one"));
        store.append(&user, Turn::assistant("two"));
        store.append(&user, Turn::user_text("three"));

        let texts: Vec<&str> = store
            .history(&user)
            .into_iter()
            .flat_map(|h| h.turns())
            .flat_map(Turn::text_parts)
            .collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn users_are_independent() {
        let mut store = SessionStore::new();
        let a = UserId::from("a");
        let b = UserId::from("b");
        store.append(&a, Turn::user_text("x"));
        store.append(&a, Turn::assistant("y"));
        store.append(&b, Turn::user_text("z"));
        assert_eq!(store.turns_for(&a).len(), 2);
        assert_eq!(store.turns_for(&b).len(), 1);
        assert!(store.turns_for(&UserId::from("c")).is_empty());
    }

    #[test]
    fn replace_all_swaps_everything() {
        let mut store = SessionStore::new();
        store.append(&UserId::from("old"), Turn::user_text("gone"));

        let mut restored = SessionStore::new();
        restored.append(&UserId::from("new"), Turn::user_text("here"));
        store.replace_all(restored);

        assert!(store.history(&UserId::from("old")).is_none());
        assert_eq!(store.turns_for(&UserId::from("new")).len(), 1);
    }
}

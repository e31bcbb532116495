//! Ordered API credentials with a round-robin cursor.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
};

use secrecy::{ExposeSecret, Secret};

use crate::error::{Error, Result};

/// One provider API key.
#[derive(Clone)]
pub struct Credential(Secret<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Secret::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl From<Secret<String>> for Credential {
    fn from(secret: Secret<String>) -> Self {
        Self(secret)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Process-wide pool of credentials.
///
/// The cursor always satisfies `0 <= cursor < len`. All reads and moves go
/// through one mutex so concurrent exchanges never see a half-applied
/// rotation.
pub struct KeyPool {
    credentials: Vec<Credential>,
    cursor: Mutex<usize>,
}

impl fmt::Debug for KeyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPool")
            .field("len", &self.credentials.len())
            .field("cursor", &self.cursor())
            .finish()
    }
}

impl KeyPool {
    pub fn new(credentials: Vec<Credential>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::EmptyKeyPool);
        }
        Ok(Self {
            credentials,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn cursor(&self) -> usize {
        *self.cursor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Active credential and its index.
    pub fn current(&self) -> (usize, &Credential) {
        let index = self.cursor();
        (index, &self.credentials[index])
    }

    /// Advance to the next credential. A pool of one never rotates.
    pub fn rotate(&self) -> bool {
        if self.credentials.len() <= 1 {
            return false;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        *cursor = (*cursor + 1) % self.credentials.len();
        true
    }

    /// Rotate away from `observed` unless another caller already has.
    ///
    /// Returns `true` when this call moved the cursor.
    pub fn rotate_from(&self, observed: usize) -> bool {
        if self.credentials.len() <= 1 {
            return false;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        if *cursor != observed {
            return false;
        }
        *cursor = (*cursor + 1) % self.credentials.len();
        true
    }

    /// Move the cursor to a credential not marked in `tried` and return it.
    ///
    /// The active credential is kept if it is untried; otherwise the next
    /// untried one after it wins. `None` once every credential is tried.
    /// `tried` is indexed like the pool.
    pub fn advance_past(&self, tried: &[bool]) -> Option<(usize, &Credential)> {
        let len = self.credentials.len();
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let index = (0..len)
            .map(|offset| (*cursor + offset) % len)
            .find(|&i| !tried.get(i).copied().unwrap_or(false))?;
        *cursor = index;
        Some((index, &self.credentials[index]))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    fn pool(n: usize) -> KeyPool {
        KeyPool::new((0..n).map(|i| Credential::new(format!("key-{i}"))).collect()).unwrap()
    }

    #[test]
    fn empty_pool_is_rejected() {
        assert!(matches!(KeyPool::new(vec![]), Err(Error::EmptyKeyPool)));
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(5)]
    fn n_rotations_return_to_start(#[case] n: usize) {
        let pool = pool(n);
        let (_, before) = pool.current();
        let before = before.expose().to_string();
        for _ in 0..n {
            pool.rotate();
        }
        assert_eq!(pool.current().1.expose(), before);
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn single_key_never_rotates() {
        let pool = pool(1);
        assert!(!pool.rotate());
        assert!(!pool.rotate_from(0));
        assert_eq!(pool.cursor(), 0);
    }

    #[test]
    fn rotation_is_round_robin() {
        let pool = pool(3);
        let seen: Vec<String> = (0..4)
            .map(|_| {
                let key = pool.current().1.expose().to_string();
                pool.rotate();
                key
            })
            .collect();
        assert_eq!(seen, vec!["key-0", "key-1", "key-2", "key-0"]);
    }

    #[test]
    fn rotate_from_stale_index_does_not_double_rotate() {
        let pool = pool(3);
        assert!(pool.rotate_from(0));
        assert_eq!(pool.cursor(), 1);
        // A second caller that also observed index 0 leaves the cursor alone.
        assert!(!pool.rotate_from(0));
        assert_eq!(pool.cursor(), 1);
    }

    #[test]
    fn advance_past_skips_tried_credentials() {
        let pool = pool(3);
        let (index, key) = pool.advance_past(&[true, false, false]).unwrap();
        assert_eq!((index, key.expose()), (1, "key-1"));
        assert_eq!(pool.cursor(), 1);

        // Cursor moved elsewhere by another exchange onto a tried key.
        pool.rotate_from(1);
        pool.rotate_from(2);
        assert_eq!(pool.cursor(), 0);
        let (index, _) = pool.advance_past(&[true, true, false]).unwrap();
        assert_eq!(index, 2);

        assert!(pool.advance_past(&[true, true, true]).is_none());
        assert_eq!(pool.cursor(), 2);
    }

    #[test]
    fn advance_past_keeps_untried_cursor() {
        let pool = pool(3);
        pool.rotate();
        pool.rotate();
        let (index, _) = pool.advance_past(&[true, false, false]).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn debug_redacts_secret() {
        let dbg = format!("{:?}", Credential::new("super-secret"));
        assert!(!dbg.contains("super-secret"));
    }
}

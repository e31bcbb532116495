//! Single-slot snapshot persistence over a [`DurableChannel`].
//!
//! Saving replaces the pinned document: the previous pin is removed (best
//! effort), the new snapshot is uploaded and pinned. Loading reads the pinned
//! document back. Failures are returned by the `try_*` methods and only logged
//! by [`PersistenceGateway::save`] and [`PersistenceGateway::load`].

use std::sync::{Arc, PoisonError, RwLock};

use {
    async_trait::async_trait,
    tokio::sync::Mutex,
    tracing::{debug, info, warn},
};

use crate::{
    error::Result,
    snapshot::PersistedSnapshot,
    store::SessionStore,
};

/// Opaque reference to an uploaded document (a message id for chat channels).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle(pub String);

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An external messaging destination used as a one-document store.
#[async_trait]
pub trait DurableChannel: Send + Sync {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        name: &str,
        caption: &str,
    ) -> Result<DocumentHandle>;

    async fn pin(&self, handle: &DocumentHandle) -> Result<()>;

    /// Handle of the currently pinned document, if any.
    async fn pinned_handle(&self) -> Result<Option<DocumentHandle>>;

    /// Remove a previously pinned document. Best effort.
    async fn unpin_or_delete(&self, handle: &DocumentHandle) -> Result<()>;

    /// Contents of the pinned document, `None` when nothing is pinned.
    async fn get_pinned_document(&self) -> Result<Option<Vec<u8>>>;
}

/// Saves and restores the session store. A gateway without a channel is a
/// no-op in both directions.
pub struct PersistenceGateway {
    channel: Option<Arc<dyn DurableChannel>>,
    file_name: String,
    caption: String,
    save_lock: Mutex<()>,
}

impl PersistenceGateway {
    pub fn new(
        channel: Arc<dyn DurableChannel>,
        file_name: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            channel: Some(channel),
            file_name: file_name.into(),
            caption: caption.into(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self {
            channel: None,
            file_name: String::new(),
            caption: String::new(),
            save_lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.channel.is_some()
    }

    /// Snapshot `store` and replace the pinned document.
    ///
    /// Saves are serialized and each one snapshots the store only once it holds
    /// the save lock, so the last save to reach the channel carries the newest
    /// state. Returns `false` when persistence is disabled.
    pub async fn try_save(&self, store: &RwLock<SessionStore>) -> Result<bool> {
        let Some(channel) = &self.channel else {
            return Ok(false);
        };
        let _guard = self.save_lock.lock().await;

        let snapshot = {
            let store = store.read().unwrap_or_else(PoisonError::into_inner);
            PersistedSnapshot::from_store(&store)
        };
        let bytes = snapshot.to_json_bytes()?;

        match channel.pinned_handle().await {
            Ok(Some(previous)) => {
                if let Err(e) = channel.unpin_or_delete(&previous).await {
                    warn!(handle = %previous, error = %e, "failed to remove previous snapshot");
                }
            },
            Ok(None) => {},
            Err(e) => warn!(error = %e, "failed to look up pinned snapshot"),
        }

        let handle = channel
            .upload_document(bytes, &self.file_name, &self.caption)
            .await?;
        channel.pin(&handle).await?;
        debug!(
            handle = %handle,
            users = snapshot.user_count(),
            turns = snapshot.turn_count(),
            "conversation snapshot saved"
        );
        Ok(true)
    }

    /// Save, logging and discarding any failure.
    pub async fn save(&self, store: &RwLock<SessionStore>) {
        if let Err(e) = self.try_save(store).await {
            warn!(error = %e, "failed to save conversation history");
        }
    }

    /// Read the pinned snapshot without restoring it.
    pub async fn try_load_snapshot(&self) -> Result<Option<PersistedSnapshot>> {
        let Some(channel) = &self.channel else {
            return Ok(None);
        };
        let Some(bytes) = channel.get_pinned_document().await? else {
            return Ok(None);
        };
        PersistedSnapshot::from_json_bytes(&bytes).map(Some)
    }

    /// Restore a store from the pinned snapshot. `None` when there is nothing
    /// to restore.
    pub async fn try_load(&self) -> Result<Option<SessionStore>> {
        Ok(self.try_load_snapshot().await?.map(PersistedSnapshot::restore))
    }

    /// Load, falling back to an empty store on any failure.
    pub async fn load(&self) -> SessionStore {
        match self.try_load().await {
            Ok(Some(store)) => {
                info!(users = store.len(), "conversation history restored");
                store
            },
            Ok(None) => {
                info!("no saved conversation history");
                SessionStore::new()
            },
            Err(e) => {
                warn!(error = %e, "failed to load conversation history, starting empty");
                SessionStore::new()
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::error::Error,
        std::sync::atomic::{AtomicBool, AtomicUsize, Ordering},
        umbra_common::{ContentPart, Turn, UserId},
    };

    /// In-memory channel keeping every uploaded document.
    #[derive(Default)]
    struct MemoryChannel {
        documents: std::sync::Mutex<Vec<(DocumentHandle, Vec<u8>, String)>>,
        pinned: std::sync::Mutex<Option<DocumentHandle>>,
        removed: std::sync::Mutex<Vec<DocumentHandle>>,
        unreachable: AtomicBool,
        fail_unpin: AtomicBool,
        uploads: AtomicUsize,
    }

    impl MemoryChannel {
        fn check(&self) -> Result<()> {
            if self.unreachable.load(Ordering::SeqCst) {
                return Err(Error::channel(
                    "request",
                    std::io::Error::other("connection refused"),
                ));
            }
            Ok(())
        }

        fn pin_raw(&self, bytes: &[u8]) {
            let handle = DocumentHandle("seed".into());
            self.documents
                .lock()
                .unwrap()
                .push((handle.clone(), bytes.to_vec(), "seed.json".into()));
            *self.pinned.lock().unwrap() = Some(handle);
        }
    }

    #[async_trait]
    impl DurableChannel for MemoryChannel {
        async fn upload_document(
            &self,
            bytes: Vec<u8>,
            name: &str,
            _caption: &str,
        ) -> Result<DocumentHandle> {
            self.check()?;
            let n = self.uploads.fetch_add(1, Ordering::SeqCst);
            let handle = DocumentHandle(format!("doc-{n}"));
            self.documents
                .lock()
                .unwrap()
                .push((handle.clone(), bytes, name.to_string()));
            Ok(handle)
        }

        async fn pin(&self, handle: &DocumentHandle) -> Result<()> {
            self.check()?;
            *self.pinned.lock().unwrap() = Some(handle.clone());
            Ok(())
        }

        async fn pinned_handle(&self) -> Result<Option<DocumentHandle>> {
            self.check()?;
            Ok(self.pinned.lock().unwrap().clone())
        }

        async fn unpin_or_delete(&self, handle: &DocumentHandle) -> Result<()> {
            if self.fail_unpin.load(Ordering::SeqCst) {
                return Err(Error::message("not enough rights"));
            }
            self.removed.lock().unwrap().push(handle.clone());
            let mut pinned = self.pinned.lock().unwrap();
            if pinned.as_ref() == Some(handle) {
                *pinned = None;
            }
            Ok(())
        }

        async fn get_pinned_document(&self) -> Result<Option<Vec<u8>>> {
            self.check()?;
            let pinned = self.pinned.lock().unwrap().clone();
            Ok(pinned.and_then(|handle| {
                self.documents
                    .lock()
                    .unwrap()
                    .iter()
                    .find(|(h, ..)| *h == handle)
                    .map(|(_, bytes, _)| bytes.clone())
            }))
        }
    }

    fn store_with(user: &str, turns: Vec<Turn>) -> RwLock<SessionStore> {
        let mut store = SessionStore::new();
        for turn in turns {
            store.append(&UserId::from(user), turn);
        }
        RwLock::new(store)
    }

    fn gateway(channel: &Arc<MemoryChannel>) -> PersistenceGateway {
        PersistenceGateway::new(channel.clone(), "umbra_backup.json", "Umbra Memory")
    }

    #[tokio::test]
    async fn save_then_load_round_trips_text() {
        let channel = Arc::new(MemoryChannel::default());
        let gw = gateway(&channel);
        let store = store_with("1", vec![
            Turn::user(vec![
                ContentPart::image("image/jpeg", vec![0xff]),
                ContentPart::text("describe"),
            ]),
            Turn::assistant("a sunset"),
        ]);

        assert!(gw.try_save(&store).await.unwrap());
        let restored = gw.load().await;
        let turns = restored.turns_for(&UserId::from("1"));
        assert_eq!(turns, vec![
            Turn::user_text("describe"),
            Turn::assistant("a sunset")
        ]);
        assert_eq!(
            channel.documents.lock().unwrap()[0].2,
            "umbra_backup.json"
        );
    }

    #[tokio::test]
    async fn save_replaces_previous_pin() {
        let channel = Arc::new(MemoryChannel::default());
        let gw = gateway(&channel);
        let store = store_with("1", vec![Turn::user_text("a")]);

        gw.save(&store).await;
        store
            .write()
            .unwrap()
            .append(&UserId::from("1"), Turn::assistant("b"));
        gw.save(&store).await;

        assert_eq!(*channel.removed.lock().unwrap(), vec![DocumentHandle(
            "doc-0".into()
        )]);
        assert_eq!(
            *channel.pinned.lock().unwrap(),
            Some(DocumentHandle("doc-1".into()))
        );
        let restored = gw.load().await;
        assert_eq!(restored.turns_for(&UserId::from("1")).len(), 2);
    }

    #[tokio::test]
    async fn failed_unpin_does_not_block_upload() {
        let channel = Arc::new(MemoryChannel::default());
        channel.pin_raw(b"{}");
        channel.fail_unpin.store(true, Ordering::SeqCst);
        let gw = gateway(&channel);

        assert!(
            gw.try_save(&store_with("1", vec![Turn::user_text("x")]))
                .await
                .unwrap()
        );
        assert_eq!(
            *channel.pinned.lock().unwrap(),
            Some(DocumentHandle("doc-0".into()))
        );
    }

    #[tokio::test]
    async fn save_swallows_unreachable_channel() {
        let channel = Arc::new(MemoryChannel::default());
        channel.unreachable.store(true, Ordering::SeqCst);
        let gw = gateway(&channel);
        let store = store_with("1", vec![Turn::user_text("x")]);

        assert!(gw.try_save(&store).await.is_err());
        gw.save(&store).await;
        assert!(gw.load().await.is_empty());
    }

    #[tokio::test]
    async fn load_without_pin_is_empty() {
        let channel = Arc::new(MemoryChannel::default());
        let gw = gateway(&channel);
        assert!(gw.try_load().await.unwrap().is_none());
        assert!(gw.load().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_document_loads_empty() {
        let channel = Arc::new(MemoryChannel::default());
        channel.pin_raw(b"{\"1\": 42");
        let gw = gateway(&channel);
        assert!(gw.try_load().await.is_err());
        assert!(gw.load().await.is_empty());
    }

    #[tokio::test]
    async fn repeated_loads_are_identical() {
        let channel = Arc::new(MemoryChannel::default());
        channel.pin_raw(
            br#"{"5": [{"role": "user", "parts": ["hi"]}, {"role": "model", "parts": ["yo"]}]}"#,
        );
        let gw = gateway(&channel);
        let first = gw.try_load_snapshot().await.unwrap();
        let second = gw.try_load_snapshot().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            gw.load().await.turns_for(&UserId::from("5")),
            gw.load().await.turns_for(&UserId::from("5"))
        );
    }

    #[tokio::test]
    async fn disabled_gateway_is_a_no_op() {
        let gw = PersistenceGateway::disabled();
        assert!(!gw.is_enabled());
        assert!(
            !gw.try_save(&store_with("1", vec![Turn::user_text("x")]))
                .await
                .unwrap()
        );
        assert!(gw.try_load().await.unwrap().is_none());
    }
}

use std::sync::{Arc, PoisonError, RwLockWriteGuard};

use {
    async_trait::async_trait,
    dashmap::DashMap,
    tokio::{sync::Mutex, task::JoinSet},
    tracing::{debug, error, info, warn},
};

use {
    umbra_agents::{RetryOrchestrator, parse_directive},
    umbra_channels::{
        ChannelOutbound, ChatAction, DEFAULT_CHUNK_CHARS, InboundEnvelope, InboundHandler,
        InboundMessage, chunk_text,
    },
    umbra_common::{ContentPart, Turn, UserId},
    umbra_media::ImageGenerator,
    umbra_sessions::{PersistenceGateway, SessionStore, SharedSessionStore},
};

use crate::chat_error::{IMAGE_FAILED_MESSAGE, user_facing_error};

/// User-visible texts and limits.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Reply to `/start`.
    pub greeting: String,
    /// Text sent with a photo that has no caption.
    pub default_image_prompt: String,
    /// Shown while an image is generated, deleted afterwards.
    pub image_placeholder: String,
    pub reply_chunk_chars: usize,
    pub error_detail_chars: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            greeting: "Hello. Send me a message or a photo.".into(),
            default_image_prompt: "Describe this image.".into(),
            image_placeholder: "🎨 Generating image...".into(),
            reply_chunk_chars: DEFAULT_CHUNK_CHARS,
            error_detail_chars: 100,
        }
    }
}

/// Handles inbound messages end to end.
///
/// Exchanges for the same user run one at a time; different users proceed
/// concurrently.
pub struct ChatService {
    orchestrator: RetryOrchestrator,
    store: SharedSessionStore,
    persistence: Arc<PersistenceGateway>,
    outbound: Arc<dyn ChannelOutbound>,
    images: Option<Arc<dyn ImageGenerator>>,
    settings: ChatSettings,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
    saves: std::sync::Mutex<JoinSet<()>>,
}

impl ChatService {
    pub fn new(
        orchestrator: RetryOrchestrator,
        outbound: Arc<dyn ChannelOutbound>,
        persistence: Arc<PersistenceGateway>,
    ) -> Self {
        Self {
            orchestrator,
            store: SessionStore::new().shared(),
            persistence,
            outbound,
            images: None,
            settings: ChatSettings::default(),
            user_locks: DashMap::new(),
            saves: std::sync::Mutex::new(JoinSet::new()),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_image_generator(mut self, images: Arc<dyn ImageGenerator>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// Replace in-memory history with the pinned snapshot. Returns the number
    /// of users restored; failures leave the store empty.
    pub async fn restore_history(&self) -> usize {
        let restored = self.persistence.load().await;
        let users = restored.len();
        self.write_store().replace_all(restored);
        users
    }

    /// Wait for every background save started so far.
    pub async fn flush_saves(&self) {
        let mut pending = {
            let mut saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *saves)
        };
        while pending.join_next().await.is_some() {}
    }

    fn write_store(&self) -> RwLockWriteGuard<'_, SessionStore> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        Arc::clone(
            self.user_locks
                .entry(user_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        )
    }

    /// Build the user turn for a message, or `None` when it needs no
    /// completion.
    async fn user_turn(&self, chat_id: &str, message: InboundMessage) -> Option<Turn> {
        match message {
            InboundMessage::Command { name, .. } if name == "start" => {
                self.send_text(chat_id, &self.settings.greeting).await;
                None
            },
            InboundMessage::Command { name, .. } => {
                debug!(command = %name, "ignoring unknown command");
                None
            },
            InboundMessage::Text(text) if text.trim().is_empty() => None,
            InboundMessage::Text(text) => Some(Turn::user_text(text)),
            InboundMessage::Image {
                data,
                media_type,
                caption,
            } => {
                let prompt = caption.unwrap_or_else(|| self.settings.default_image_prompt.clone());
                Some(Turn::user(vec![
                    ContentPart::image(media_type, data),
                    ContentPart::text(prompt),
                ]))
            },
        }
    }

    /// One complete exchange for `user_id`. Holds the user's lock throughout.
    async fn exchange(&self, user_id: &UserId, chat_id: &str, turn: Turn) {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        let action = if turn.has_image() {
            ChatAction::UploadPhoto
        } else {
            ChatAction::Typing
        };
        if let Err(e) = self.outbound.send_chat_action(chat_id, action).await {
            debug!(chat_id, error = %e, "failed to send chat action");
        }

        let history = {
            let mut store = self.write_store();
            store.get_or_create(user_id).turns().to_vec()
        };

        let reply = match self.orchestrator.invoke(&history, &turn).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(user_id = %user_id, error = %e, "exchange failed");
                let text = user_facing_error(&e, self.settings.error_detail_chars);
                self.send_text(chat_id, &text).await;
                return;
            },
        };

        {
            let mut store = self.write_store();
            store.append(user_id, turn);
            store.append(user_id, Turn::assistant(reply.clone()));
        }

        let parsed = parse_directive(&reply);
        for chunk in chunk_text(&parsed.visible_text, self.settings.reply_chunk_chars) {
            self.send_text(chat_id, &chunk).await;
        }
        if let Some(prompt) = parsed.directive.filter(|p| !p.is_empty()) {
            self.deliver_image(chat_id, &prompt).await;
        }

        self.schedule_save();
    }

    async fn deliver_image(&self, chat_id: &str, prompt: &str) {
        let Some(images) = &self.images else {
            debug!("image generation disabled, dropping directive");
            return;
        };
        info!(chat_id, generator = images.name(), "generating image");

        let placeholder = match self
            .outbound
            .send_text(chat_id, &self.settings.image_placeholder)
            .await
        {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!(chat_id, error = %e, "failed to send image placeholder");
                None
            },
        };
        if let Err(e) = self
            .outbound
            .send_chat_action(chat_id, ChatAction::UploadPhoto)
            .await
        {
            debug!(chat_id, error = %e, "failed to send chat action");
        }

        let delivered = match images.generate(prompt).await {
            Ok(image) => match self
                .outbound
                .send_photo_url(chat_id, image.url.as_str(), None)
                .await
            {
                Ok(_) => true,
                Err(e) => {
                    warn!(chat_id, error = %e, "failed to send generated image");
                    false
                },
            },
            Err(e) => {
                warn!(chat_id, error = %e, "image generation failed");
                false
            },
        };

        if let Some(placeholder) = placeholder
            && let Err(e) = self
                .outbound
                .delete_message(chat_id, &placeholder.message_id)
                .await
        {
            debug!(chat_id, error = %e, "failed to delete image placeholder");
        }
        if !delivered {
            self.send_text(chat_id, IMAGE_FAILED_MESSAGE).await;
        }
    }

    async fn send_text(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.outbound.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to send reply");
        }
    }

    /// Save in the background; the serving path never waits on it.
    fn schedule_save(&self) {
        if !self.persistence.is_enabled() {
            return;
        }
        let persistence = Arc::clone(&self.persistence);
        let store = Arc::clone(&self.store);
        let mut saves = self.saves.lock().unwrap_or_else(PoisonError::into_inner);
        while saves.try_join_next().is_some() {}
        saves.spawn(async move {
            persistence.save(&store).await;
        });
    }
}

#[async_trait]
impl InboundHandler for ChatService {
    async fn handle(&self, inbound: InboundEnvelope) {
        let InboundEnvelope {
            user_id,
            chat_id,
            sender_name,
            message,
        } = inbound;
        debug!(
            user_id = %user_id,
            chat_id,
            sender = ?sender_name,
            message = ?message,
            "inbound message"
        );

        if let Some(turn) = self.user_turn(&chat_id, message).await {
            self.exchange(&user_id, &chat_id, turn).await;
        }
    }
}

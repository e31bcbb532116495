//! A Telegram channel used as a one-document store.
//!
//! The current snapshot is the pinned message of the channel. The bot must be
//! an admin of the channel with rights to post, pin and delete.

use {
    async_trait::async_trait,
    teloxide::{
        payloads::{PinChatMessageSetters, SendDocumentSetters, UnpinChatMessageSetters},
        prelude::*,
        types::{ChatId, InputFile, MessageId, Recipient},
    },
    tracing::{debug, warn},
};

use umbra_sessions::{DocumentHandle, DurableChannel};

use crate::{
    error::{Error, Result},
    handlers::download_telegram_file,
};

pub struct TelegramDurableChannel {
    bot: Bot,
    channel: Recipient,
}

/// Numeric ids address the chat directly; anything else is a public
/// `@username`.
pub fn parse_recipient(raw: &str) -> Result<Recipient> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::InvalidChatId {
            chat_id: raw.to_string(),
        });
    }
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(Recipient::Id(ChatId(id)));
    }
    let username = if raw.starts_with('@') {
        raw.to_string()
    } else {
        format!("@{raw}")
    };
    Ok(Recipient::ChannelUsername(username))
}

fn parse_handle(handle: &DocumentHandle) -> Result<MessageId> {
    handle
        .0
        .parse::<i32>()
        .map(MessageId)
        .map_err(|_| Error::message(format!("invalid document handle {handle}")))
}

impl TelegramDurableChannel {
    pub fn new(bot: Bot, channel_id: &str) -> Result<Self> {
        Ok(Self {
            bot,
            channel: parse_recipient(channel_id)?,
        })
    }

    async fn pinned_message(&self) -> Result<Option<Message>> {
        let chat = self.bot.get_chat(self.channel.clone()).await?;
        Ok(chat.pinned_message.map(|m| *m))
    }
}

#[async_trait]
impl DurableChannel for TelegramDurableChannel {
    async fn upload_document(
        &self,
        bytes: Vec<u8>,
        name: &str,
        caption: &str,
    ) -> umbra_sessions::Result<DocumentHandle> {
        let size = bytes.len();
        let input = InputFile::memory(bytes).file_name(name.to_string());
        let mut req = self.bot.send_document(self.channel.clone(), input);
        if !caption.is_empty() {
            req = req.caption(caption);
        }
        let message = req.await.map_err(Error::from)?;
        debug!(message_id = message.id.0, bytes = size, "snapshot document uploaded");
        Ok(DocumentHandle(message.id.0.to_string()))
    }

    async fn pin(&self, handle: &DocumentHandle) -> umbra_sessions::Result<()> {
        let message_id = parse_handle(handle)?;
        self.bot
            .pin_chat_message(self.channel.clone(), message_id)
            .disable_notification(true)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn pinned_handle(&self) -> umbra_sessions::Result<Option<DocumentHandle>> {
        Ok(self
            .pinned_message()
            .await?
            .map(|m| DocumentHandle(m.id.0.to_string())))
    }

    async fn unpin_or_delete(&self, handle: &DocumentHandle) -> umbra_sessions::Result<()> {
        let message_id = parse_handle(handle)?;
        if let Err(e) = self
            .bot
            .unpin_chat_message(self.channel.clone())
            .message_id(message_id)
            .await
        {
            warn!(message_id = message_id.0, error = %e, "failed to unpin snapshot");
        }
        self.bot
            .delete_message(self.channel.clone(), message_id)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn get_pinned_document(&self) -> umbra_sessions::Result<Option<Vec<u8>>> {
        let Some(message) = self.pinned_message().await? else {
            return Ok(None);
        };
        let Some(document) = message.document() else {
            warn!(message_id = message.id.0, "pinned message is not a document");
            return Ok(None);
        };
        let bytes = download_telegram_file(&self.bot, &document.file.id).await?;
        Ok(Some(bytes))
    }
}

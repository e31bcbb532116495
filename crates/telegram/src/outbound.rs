use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        RequestError,
        payloads::SendPhotoSetters,
        prelude::*,
        types::{ChatAction as TgChatAction, ChatId, InputFile, MessageId},
    },
    tracing::{debug, warn},
};

use umbra_channels::{ChannelOutbound, ChatAction, SentMessage};

use crate::error::{Error, Result};

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

/// Parse a numeric chat id.
pub(crate) fn parse_chat_id(to: &str) -> Result<ChatId> {
    to.trim()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::InvalidChatId {
            chat_id: to.to_string(),
        })
}

fn parse_message_id(id: &str) -> Result<MessageId> {
    id.trim()
        .parse::<i32>()
        .map(MessageId)
        .map_err(|_| Error::message(format!("invalid message id {id:?}")))
}

fn sent(chat_id: ChatId, message: &Message) -> SentMessage {
    SentMessage {
        chat_id: chat_id.0.to_string(),
        message_id: message.id.0.to_string(),
    }
}

fn to_telegram_action(action: ChatAction) -> TgChatAction {
    match action {
        ChatAction::Typing => TgChatAction::Typing,
        ChatAction::UploadPhoto => TgChatAction::UploadPhoto,
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Run a request, waiting out `RetryAfter` responses a bounded number of
/// times.
pub(crate) async fn run_with_retry<T, F, Fut>(
    to: &str,
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id = to,
                        operation,
                        retries,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id = to,
                    operation,
                    retries,
                    max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

#[async_trait]
impl ChannelOutbound for TelegramOutbound {
    async fn send_text(&self, to: &str, text: &str) -> umbra_channels::Result<SentMessage> {
        let chat_id = parse_chat_id(to)?;
        let message = run_with_retry(to, "send message", || {
            let req = self.bot.send_message(chat_id, text);
            async move { req.await }
        })
        .await
        .map_err(Error::from)?;
        debug!(chat_id = to, chars = text.chars().count(), "telegram text sent");
        Ok(sent(chat_id, &message))
    }

    async fn send_photo_url(
        &self,
        to: &str,
        url: &str,
        caption: Option<&str>,
    ) -> umbra_channels::Result<SentMessage> {
        let chat_id = parse_chat_id(to)?;
        let url: reqwest::Url = url
            .parse()
            .map_err(|e| umbra_channels::Error::invalid_input(format!("photo url: {e}")))?;
        let message = run_with_retry(to, "send photo", || {
            let mut req = self.bot.send_photo(chat_id, InputFile::url(url.clone()));
            if let Some(caption) = caption.filter(|c| !c.is_empty()) {
                req = req.caption(caption);
            }
            async move { req.await }
        })
        .await
        .map_err(Error::from)?;
        debug!(chat_id = to, "telegram photo sent");
        Ok(sent(chat_id, &message))
    }

    async fn delete_message(&self, to: &str, message_id: &str) -> umbra_channels::Result<()> {
        let chat_id = parse_chat_id(to)?;
        let message_id = parse_message_id(message_id)?;
        self.bot
            .delete_message(chat_id, message_id)
            .await
            .map_err(Error::from)?;
        Ok(())
    }

    async fn send_chat_action(&self, to: &str, action: ChatAction) -> umbra_channels::Result<()> {
        let chat_id = parse_chat_id(to)?;
        self.bot
            .send_chat_action(chat_id, to_telegram_action(action))
            .await
            .map_err(Error::from)?;
        Ok(())
    }
}

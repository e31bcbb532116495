use {
    teloxide::{
        prelude::*,
        types::{MediaKind, MessageKind},
    },
    tracing::{debug, info},
};

use {
    umbra_channels::{InboundEnvelope, InboundHandler, InboundMessage},
    umbra_common::UserId,
};

use crate::error::{Error, Result};

/// What a Telegram message carries, before any download.
#[derive(Debug, PartialEq, Eq)]
enum Incoming {
    Text(String),
    Photo {
        file_id: String,
        media_type: String,
        caption: Option<String>,
    },
}

/// Turn one Telegram message into an inbound envelope and hand it over.
///
/// Messages without text or a photo are ignored.
pub async fn handle_message(msg: Message, bot: &Bot, handler: &dyn InboundHandler) -> Result<()> {
    let Some(incoming) = classify(&msg) else {
        debug!(chat_id = msg.chat.id.0, "ignoring unsupported telegram message");
        return Ok(());
    };

    let message = match incoming {
        Incoming::Text(text) => InboundMessage::from_text(text),
        Incoming::Photo {
            file_id,
            media_type,
            caption,
        } => {
            let data = download_telegram_file(bot, &file_id).await?;
            info!(
                chat_id = msg.chat.id.0,
                bytes = data.len(),
                "downloaded photo"
            );
            InboundMessage::Image {
                data,
                media_type,
                caption,
            }
        },
    };

    handler
        .handle(InboundEnvelope {
            user_id: sender_id(&msg),
            chat_id: msg.chat.id.0.to_string(),
            sender_name: sender_name(&msg),
            message,
        })
        .await;
    Ok(())
}

fn classify(msg: &Message) -> Option<Incoming> {
    if let Some(photo) = extract_photo(msg) {
        return Some(photo);
    }
    extract_text(msg).map(Incoming::Text)
}

/// Extract text content from a message.
fn extract_text(msg: &Message) -> Option<String> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Text(t) => Some(t.text.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Extract photo info from a message, choosing the largest size.
fn extract_photo(msg: &Message) -> Option<Incoming> {
    match &msg.kind {
        MessageKind::Common(common) => match &common.media_kind {
            MediaKind::Photo(p) => p.photo.last().map(|ps| Incoming::Photo {
                file_id: ps.file.id.clone(),
                // Telegram re-encodes photos as JPEG.
                media_type: "image/jpeg".to_string(),
                caption: p.caption.clone().filter(|c| !c.trim().is_empty()),
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Conversation owner: the sender, or the chat for anonymous posts.
fn sender_id(msg: &Message) -> UserId {
    msg.from
        .as_ref()
        .map(|u| UserId::from(u.id.0))
        .unwrap_or_else(|| UserId::from(msg.chat.id.0))
}

fn sender_name(msg: &Message) -> Option<String> {
    msg.from.as_ref().and_then(|u| {
        let first = &u.first_name;
        let last = u.last_name.as_deref().unwrap_or("");
        let name = format!("{first} {last}").trim().to_string();
        if name.is_empty() {
            u.username.clone()
        } else {
            Some(name)
        }
    })
}

/// Download a file from Telegram by file ID.
pub(crate) async fn download_telegram_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>> {
    let file = bot.get_file(file_id).await?;

    // https://api.telegram.org/file/bot<token>/<file_path>
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );

    let response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(Error::message(format!(
            "failed to download file: HTTP {}",
            response.status()
        )));
    }

    Ok(response.bytes().await?.to_vec())
}

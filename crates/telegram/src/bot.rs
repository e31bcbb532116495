use std::{sync::Arc, time::Duration};

use {
    secrecy::ExposeSecret,
    teloxide::{
        ApiError, RequestError,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use umbra_channels::InboundHandler;

use crate::{config::TelegramBotConfig, error::Result, handlers};

/// Delay before polling again after a failed `getUpdates`.
const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Build a bot whose HTTP client outlives the long-poll timeout.
pub fn build_bot(config: &TelegramBotConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(Duration::from_secs(u64::from(config.poll_timeout_secs) + 15))
        .build()?;
    Ok(Bot::with_client(config.token.expose_secret(), client))
}

/// Verify the token, clear any webhook and register the slash commands.
///
/// Returns the bot's username.
pub async fn connect(bot: &Bot) -> Result<Option<String>> {
    let me = bot.get_me().await?;
    let username = me.username.clone();

    // Long polling does not work while a webhook is set.
    bot.delete_webhook().send().await?;

    let commands = vec![BotCommand::new("start", "Start a conversation")];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?username, "telegram bot connected (webhook cleared)");
    Ok(username)
}

/// Poll for updates until the returned token is cancelled.
///
/// Each message is handled on its own task so a slow exchange does not hold
/// up other chats.
pub fn start_polling(
    bot: Bot,
    poll_timeout_secs: u32,
    handler: Arc<dyn InboundHandler>,
) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        info!("starting telegram polling loop");
        let mut offset: i32 = 0;

        loop {
            if cancel_clone.is_cancelled() {
                info!("telegram polling stopped");
                break;
            }

            let request = bot
                .get_updates()
                .offset(offset)
                .timeout(poll_timeout_secs)
                .allowed_updates(vec![AllowedUpdate::Message]);
            let result = tokio::select! {
                _ = cancel_clone.cancelled() => {
                    info!("telegram polling stopped");
                    break;
                },
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                debug!(chat_id = msg.chat.id.0, "received telegram message");
                                let bot = bot.clone();
                                let handler = Arc::clone(&handler);
                                tokio::spawn(async move {
                                    if let Err(e) =
                                        handlers::handle_message(msg, &bot, handler.as_ref()).await
                                    {
                                        error!(error = %e, "error handling telegram message");
                                    }
                                });
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(e) => {
                    // Another instance is polling with the same token.
                    if matches!(&e, RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) {
                        error!("telegram polling disabled: another instance is running with this token");
                        cancel_clone.cancel();
                        break;
                    }

                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                },
            }
        }
    });

    cancel
}

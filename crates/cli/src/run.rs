use std::sync::Arc;

use {
    anyhow::Context,
    tracing::{info, warn},
};

use {
    umbra_agents::{Credential, KeyPool, RetryOrchestrator, providers::GeminiClient},
    umbra_config::UmbraConfig,
    umbra_gateway::{ChatService, ChatSettings},
    umbra_media::PollinationsGenerator,
    umbra_sessions::PersistenceGateway,
    umbra_telegram::{
        Bot, TelegramBotConfig, TelegramDurableChannel, TelegramOutbound, build_bot, connect,
        start_polling,
    },
};

/// Build the persistence gateway for `config`, disabled when no channel is set.
pub(crate) fn persistence_gateway(
    config: &UmbraConfig,
    bot: &Bot,
) -> anyhow::Result<PersistenceGateway> {
    let persistence = &config.persistence;
    let Some(channel_id) = persistence.channel_id.as_deref().filter(|_| persistence.is_enabled())
    else {
        info!("no persistence channel configured, history is kept in memory only");
        return Ok(PersistenceGateway::disabled());
    };
    let channel = TelegramDurableChannel::new(bot.clone(), channel_id.trim())
        .context("invalid persistence.channel_id")?;
    Ok(PersistenceGateway::new(
        Arc::new(channel),
        persistence.file_name.clone(),
        persistence.caption.clone(),
    ))
}

pub(crate) fn bot_config(config: &UmbraConfig) -> TelegramBotConfig {
    TelegramBotConfig {
        token: config.telegram.token.clone(),
        poll_timeout_secs: config.telegram.poll_timeout_secs,
    }
}

/// Wire every component and serve until Ctrl-C.
pub async fn run(config: UmbraConfig) -> anyhow::Result<()> {
    umbra_config::ensure_startable(&config)?;
    for diagnostic in umbra_config::validate(&config).diagnostics {
        warn!(%diagnostic, "config");
    }

    let keys: Vec<Credential> = config
        .provider
        .usable_keys()
        .into_iter()
        .map(Credential::from)
        .collect();
    let pool = Arc::new(KeyPool::new(keys)?);
    info!(keys = pool.len(), model = %config.provider.model, "credential pool ready");

    let client = GeminiClient::new(&config.provider.model, &config.provider.base_url)
        .with_max_output_tokens(config.provider.max_output_tokens);
    let orchestrator =
        RetryOrchestrator::new(pool, Arc::new(client), config.chat.load_system_prompt())
            .with_rotate_on_success(config.provider.rotate_on_success);

    let bot = build_bot(&bot_config(&config))?;
    connect(&bot).await.context("telegram connection failed")?;

    let persistence = Arc::new(persistence_gateway(&config, &bot)?);
    let settings = ChatSettings {
        greeting: config.chat.greeting.clone(),
        default_image_prompt: config.chat.default_image_prompt.clone(),
        image_placeholder: config.image.placeholder_text.clone(),
        reply_chunk_chars: config.chat.reply_chunk_chars,
        error_detail_chars: config.chat.error_detail_chars,
    };
    let mut service = ChatService::new(
        orchestrator,
        Arc::new(TelegramOutbound::new(bot.clone())),
        persistence,
    )
    .with_settings(settings);

    if config.image.enabled {
        let image = &config.image;
        let generator = PollinationsGenerator::new(&image.base_url)
            .with_model(&image.model)
            .with_size(image.width, image.height)
            .with_style_prefix(&image.style_prefix);
        service = service.with_image_generator(Arc::new(generator));
    } else {
        info!("image generation disabled");
    }

    let users = service.restore_history().await;
    info!(users, "conversation history restored");

    let service = Arc::new(service);
    let cancel = start_polling(bot, config.telegram.poll_timeout_secs, service.clone());

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            info!("shutdown requested");
        },
        () = cancel.cancelled() => {
            warn!("polling loop stopped");
        },
    }
    cancel.cancel();
    service.flush_saves().await;
    info!("umbra stopped");
    Ok(())
}

use std::path::Path;

use {
    anyhow::{Context, Result, bail},
    tracing::info,
};

use {umbra_config::UmbraConfig, umbra_telegram::build_bot};

use crate::run::{bot_config, persistence_gateway};

/// Fetch the pinned snapshot and write it to `out` unchanged.
pub async fn export(config: &UmbraConfig, out: &Path) -> Result<()> {
    if !config.persistence.is_enabled() {
        bail!("persistence.channel_id is not set, there is no snapshot to export");
    }

    let bot = build_bot(&bot_config(config))?;
    let gateway = persistence_gateway(config, &bot)?;
    let Some(snapshot) = gateway
        .try_load_snapshot()
        .await
        .context("failed to read the pinned snapshot")?
    else {
        eprintln!("No pinned snapshot found.");
        return Ok(());
    };

    tokio::fs::write(out, snapshot.to_json_bytes()?)
        .await
        .with_context(|| format!("failed to write {}", out.display()))?;
    info!(
        path = %out.display(),
        users = snapshot.user_count(),
        turns = snapshot.turn_count(),
        "history exported"
    );
    eprintln!(
        "Exported {} conversation(s) to {}",
        snapshot.user_count(),
        out.display()
    );
    Ok(())
}

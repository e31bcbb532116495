use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, info, warn},
};

use crate::{
    env_subst::substitute_env,
    error::{Context, Error, Result},
    schema::UmbraConfig,
};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["umbra.toml", "umbra.yaml", "umbra.yml", "umbra.json"];

/// Environment variables applied on top of the config file.
pub const ENV_TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const ENV_API_KEYS: &str = "GEMINI_API_KEY";
pub const ENV_CHANNEL_ID: &str = "DB_CHANNEL_ID";
pub const ENV_MODEL: &str = "GEMINI_MODEL";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<UmbraConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path).with_context(|| format!("invalid config {}", path.display()))
}

/// Load the config used at startup.
///
/// An explicit path must exist and parse. Without one, standard locations are
/// searched:
/// 1. `./umbra.{toml,yaml,yml,json}`
/// 2. `~/.config/umbra/umbra.{toml,yaml,yml,json}`
///
/// Falls back to `UmbraConfig::default()` when nothing is found. Environment
/// overrides are applied in every case.
pub fn load(explicit: Option<&Path>) -> Result<UmbraConfig> {
    let cfg = match explicit {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_config(path)?
        },
        None => discover_and_load(),
    };
    Ok(apply_env_overrides(cfg))
}

/// Discover and load config from standard locations, defaults on failure.
pub fn discover_and_load() -> UmbraConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    UmbraConfig::default()
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/umbra/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "umbra").map(|d| d.config_dir().to_path_buf())
}

/// Apply `TELEGRAM_TOKEN`, `GEMINI_API_KEY`, `DB_CHANNEL_ID` and
/// `GEMINI_MODEL` from the process environment.
pub fn apply_env_overrides(cfg: UmbraConfig) -> UmbraConfig {
    apply_env_overrides_with(cfg, |name| std::env::var(name).ok())
}

/// Same as [`apply_env_overrides`] with a custom lookup, for tests.
fn apply_env_overrides_with(
    mut cfg: UmbraConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> UmbraConfig {
    if let Some(token) = lookup(ENV_TELEGRAM_TOKEN).filter(|t| !t.trim().is_empty()) {
        cfg.telegram.token = Secret::new(token.trim().to_string());
    }

    if let Some(raw) = lookup(ENV_API_KEYS) {
        let keys: Vec<Secret<String>> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| Secret::new(k.to_string()))
            .collect();
        if !keys.is_empty() {
            cfg.provider.api_keys = keys;
        }
    }

    if let Some(channel) = lookup(ENV_CHANNEL_ID).filter(|c| !c.trim().is_empty()) {
        cfg.persistence.channel_id = Some(channel.trim().to_string());
    }

    if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
        cfg.provider.model = model.trim().to_string();
    }

    cfg
}

fn parse_config(raw: &str, path: &Path) -> Result<UmbraConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        other => Err(Error::UnsupportedFormat(other.to_string())),
    }
}

//! Configuration resolution for the storefront server.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/empire/settings.json)
//! 3. Explicit settings file (`--config`)
//! 4. Environment variables
//!
//! CLI flags for the listen address, database and secrets are handled by
//! the server binary itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::pricing::Currency;

/// Complete storefront configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storefront: StorefrontConfig,
}

/// HTTP server limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1 MB
            request_timeout_secs: 30,
        }
    }
}

/// Storefront behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Currency used for "From $X" prices when the request names none.
    pub default_currency: Currency,
    /// Upper bound on trimmed comment length.
    pub comment_max_chars: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            default_currency: Currency::Usd,
            comment_max_chars: crate::validation::COMMENT_MAX_CHARS,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<StoreConfig> {
    let mut config = StoreConfig::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            config = load_config_file(&global_path)?;
        }
    }

    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }
        config = load_config_file(path)?;
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("empire").join("settings.json"))
}

fn load_config_file(path: &Path) -> Result<StoreConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn apply_env_overrides(config: &mut StoreConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("EMPIRE_DEFAULT_CURRENCY") {
        if let Ok(currency) = val.parse() {
            config.storefront.default_currency = currency;
        }
    }
    if let Some(val) = var("EMPIRE_MAX_BODY_BYTES") {
        if let Ok(n) = val.parse() {
            config.server.max_body_bytes = n;
        }
    }
    if let Some(val) = var("EMPIRE_REQUEST_TIMEOUT_SECS") {
        if let Ok(n) = val.parse() {
            config.server.request_timeout_secs = n;
        }
    }
}

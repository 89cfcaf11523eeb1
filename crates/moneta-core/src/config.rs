//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which holds the API hosts, the request timeout, and the last email used
//! to log in.
//!
//! Configuration is stored at `~/.config/moneta/config.json`. Environment
//! variables (`MONETA_API_URL`, `MONETA_FALLBACK_URL`, `MONETA_TIMEOUT_MS`)
//! override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "moneta";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Development backend, reached over `adb reverse` when the device is on USB.
const DEFAULT_BASE_URL: &str = "http://localhost:8001/api";

/// Same backend reached over the local network.
const DEFAULT_FALLBACK_URL: &str = "http://192.168.1.25:8001/api";

/// Request timeout in milliseconds.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

pub const ENV_API_URL: &str = "MONETA_API_URL";
pub const ENV_FALLBACK_URL: &str = "MONETA_FALLBACK_URL";
pub const ENV_TIMEOUT_MS: &str = "MONETA_TIMEOUT_MS";

/// Connection settings for [`crate::ApiClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub fallback_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fallback_url: Some(DEFAULT_FALLBACK_URL.to_string()),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl ApiConfig {
    /// Config with a single host and no fallback.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            fallback_url: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn with_fallback(mut self, fallback_url: impl Into<String>) -> Self {
        self.fallback_url = Some(fallback_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        // A zero timeout would disable the bound entirely.
        self.timeout_ms = (timeout.as_millis() as u64).max(1);
        self
    }

    /// Request timeout. A zero `timeout_ms` (e.g. from a hand-edited config
    /// file) means the default.
    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Apply environment overrides. An empty `MONETA_FALLBACK_URL` disables
    /// the fallback host.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(url) = lookup(ENV_FALLBACK_URL) {
            let url = url.trim();
            self.fallback_url = if url.is_empty() {
                None
            } else {
                Some(url.to_string())
            };
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            match ms.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.timeout_ms = ms,
                _ => warn!(value = %ms, "Ignoring invalid {}", ENV_TIMEOUT_MS),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.api.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

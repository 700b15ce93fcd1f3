//! Client configuration
//!
//! Defaults are 10 second polling, a 600 ms bell animation and pages of 50.
//! A JSON file in the app config directory may override any field, and a
//! couple of environment variables override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_PAGE_SIZE: u32 = 50;

const CONFIG_FILE: &str = "config.json";

pub const ENV_API_URL: &str = "EASEL_API_URL";
pub const ENV_DEBUG_LOGGING: &str = "EASEL_DEBUG_LOGGING";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_url: String,
    pub unread_poll_interval_ms: u64,
    pub list_poll_interval_ms: u64,
    pub signal_duration_ms: u64,
    pub page_size: u32,
    /// Per-request timeout; `None` keeps the transport default
    pub request_timeout_secs: Option<u64>,
    pub debug_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            unread_poll_interval_ms: 10_000,
            list_poll_interval_ms: 10_000,
            signal_duration_ms: 600,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout_secs: None,
            debug_logging: false,
        }
    }
}

impl ClientConfig {
    /// Load from `path`, falling back to defaults when the file is missing.
    ///
    /// A file that exists but cannot be parsed is an error rather than a
    /// silent reset to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("[config] No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: ClientConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    /// Load from the default location and apply environment overrides.
    pub fn load_default() -> Result<Self> {
        let mut config = Self::load(&default_config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(flag) = lookup(ENV_DEBUG_LOGGING) {
            self.debug_logging = matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn unread_poll_interval(&self) -> Duration {
        Duration::from_millis(self.unread_poll_interval_ms)
    }

    pub fn list_poll_interval(&self) -> Duration {
        Duration::from_millis(self.list_poll_interval_ms)
    }

    pub fn signal_duration(&self) -> Duration {
        Duration::from_millis(self.signal_duration_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug_logging {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(crate::auth::app_config_dir()?.join(CONFIG_FILE))
}

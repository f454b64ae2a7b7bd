//! Configuration - `~/.snapdeck/config.yaml` plus environment overrides

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_LOG_FILE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SERVER_INTERVAL_MS,
    DEFAULT_SERVER_URL, DEFAULT_TASKS_INTERVAL_MS,
};

const CONFIG_FILE: &str = "config.yaml";

/// How to reach (and optionally launch) the backend control server
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Program and arguments that start the server; empty means the server
    /// is managed outside snapdeck
    pub command: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            url: String::from(DEFAULT_SERVER_URL),
            username: None,
            password: None,
            command: Vec::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub server_interval_ms: u64,
    pub tasks_interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        PollingConfig {
            server_interval_ms: DEFAULT_SERVER_INTERVAL_MS,
            tasks_interval_ms: DEFAULT_TASKS_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    pub fn server_interval(&self) -> Duration {
        Duration::from_millis(self.server_interval_ms)
    }

    pub fn tasks_interval(&self) -> Duration {
        Duration::from_millis(self.tasks_interval_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub polling: PollingConfig,
    pub log_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig::default(),
            polling: PollingConfig::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl Config {
    /// Directory holding snapdeck's configuration
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".snapdeck")
    }

    /// Load the default config file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_dir().join(CONFIG_FILE))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SNAPDECK_*` overrides looked up through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SNAPDECK_SERVER_URL") {
            self.server.url = url;
        }
        if let Some(username) = lookup("SNAPDECK_USERNAME") {
            self.server.username = Some(username);
        }
        if let Some(password) = lookup("SNAPDECK_PASSWORD") {
            self.server.password = Some(password);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.polling.server_interval_ms == 0 {
            bail!("polling.server_interval_ms must be positive");
        }
        if self.polling.tasks_interval_ms == 0 {
            bail!("polling.tasks_interval_ms must be positive");
        }
        if self.server.request_timeout_secs == 0 {
            bail!("server.request_timeout_secs must be positive");
        }
        if self.server.url.trim().is_empty() {
            bail!("server.url must not be empty");
        }
        Ok(())
    }
}

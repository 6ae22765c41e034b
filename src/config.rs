//! Client configuration.
//!
//! Layering, lowest to highest priority: built-in defaults, a TOML file,
//! environment variables, then CLI flags (applied by the binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnosunuError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Environment variable holding the API base URL.
pub const API_URL_ENV: &str = "ANOSUNU_API_URL";
/// The web build's variable, honoured so both front ends can share one `.env`.
pub const LEGACY_API_URL_ENV: &str = "VITE_API_URL";
/// Environment variable pointing at a TOML config file.
pub const CONFIG_PATH_ENV: &str = "ANOSUNU_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the REST API, without a trailing slash.
    pub api_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Interval between Wave payment status checks.
    pub payment_poll_interval_secs: u64,
    /// Cap on payment status checks. `None` polls until the flow is cancelled.
    pub payment_poll_max_attempts: Option<u32>,
    /// Interval between join-request status checks.
    pub join_poll_interval_secs: u64,
    pub join_poll_max_attempts: u32,
    /// Where the session token is persisted. Defaults next to the config file.
    pub session_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: 20,
            payment_poll_interval_secs: 10,
            payment_poll_max_attempts: None,
            join_poll_interval_secs: 3,
            join_poll_max_attempts: 60,
            session_file: None,
        }
    }
}

impl ClientConfig {
    /// Parse a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: ClientConfig =
            toml::from_str(s).map_err(|e| AnosunuError::Config(e.to_string()))?;
        cfg.normalized()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnosunuError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Resolve the full configuration: explicit path, else `ANOSUNU_CONFIG`,
    /// else the default location if it exists, else defaults. Environment
    /// overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from))
            .or_else(|| default_config_path().filter(|p| p.exists()));

        let cfg = match path {
            Some(p) => {
                debug!(path = %p.display(), "loading config file");
                Self::from_file(&p)?
            }
            None => Self::default(),
        };
        cfg.with_env_overrides(|k| std::env::var(k).ok())
    }

    /// Apply `ANOSUNU_API_URL` (preferred) or `VITE_API_URL`.
    ///
    /// Takes a lookup function so tests do not touch the process environment.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).or_else(|| lookup(LEGACY_API_URL_ENV)) {
            if !url.trim().is_empty() {
                self.api_url = url;
            }
        }
        self.normalized()
    }

    /// Override the base URL (from a CLI flag).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Result<Self> {
        self.api_url = url.into();
        self.normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        let url = self.api_url.trim().trim_end_matches('/').to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AnosunuError::Config(format!(
                "api_url must start with http:// or https:// (got {url:?})"
            )));
        }
        if self.payment_poll_interval_secs == 0 || self.join_poll_interval_secs == 0 {
            return Err(AnosunuError::Config(
                "poll intervals must be at least one second".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(AnosunuError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        self.api_url = url;
        Ok(self)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn payment_poll_interval(&self) -> Duration {
        Duration::from_secs(self.payment_poll_interval_secs)
    }

    pub fn join_poll_interval(&self) -> Duration {
        Duration::from_secs(self.join_poll_interval_secs)
    }

    /// Session file location: explicit setting, else beside the default config.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.session_file
            .clone()
            .or_else(|| config_dir().map(|d| d.join("session.json")))
    }
}

fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .map(|d| d.join("anosunu"))
}

/// `$XDG_CONFIG_HOME/anosunu/config.toml` or `~/.config/anosunu/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

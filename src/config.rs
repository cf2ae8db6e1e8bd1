//!
//! careerscope client configuration
//! --------------------------------
//! Settings are resolved in three layers: built-in defaults, an optional JSON file
//! named by `CAREERSCOPE_CONFIG`, then individual `CAREERSCOPE_*` environment
//! overrides. A value that fails to parse is a `Config` error; nothing is silently
//! replaced by its default.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

pub const ENV_CONFIG_FILE: &str = "CAREERSCOPE_CONFIG";
pub const ENV_API_URL: &str = "CAREERSCOPE_API_URL";
pub const ENV_CREDENTIAL_FILE: &str = "CAREERSCOPE_CREDENTIAL_FILE";
pub const ENV_POLL_INTERVAL_MS: &str = "CAREERSCOPE_POLL_INTERVAL_MS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "CAREERSCOPE_POLL_MAX_ATTEMPTS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "CAREERSCOPE_HTTP_TIMEOUT_MS";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Base of the versioned API, e.g. `http://localhost:8000/api/v1`.
    #[serde(default = "ClientConfig::default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "crate::client_paths::default_credentials_file")]
    pub credential_path: PathBuf,
    #[serde(default = "ClientConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// `None` (or `0` via env) disables the limit.
    #[serde(default = "ClientConfig::default_poll_max_attempts")]
    pub poll_max_attempts: Option<u32>,
    #[serde(default = "ClientConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ClientConfig {
    fn default_api_base_url() -> String { "http://localhost:8000/api/v1".to_string() }
    fn default_poll_interval_ms() -> u64 { 3_000 }
    fn default_poll_max_attempts() -> Option<u32> { Some(200) }
    fn default_request_timeout_ms() -> u64 { 30_000 }

    pub fn poll_interval(&self) -> Duration { Duration::from_millis(self.poll_interval_ms) }
    pub fn request_timeout(&self) -> Duration { Duration::from_millis(self.request_timeout_ms) }

    /// Defaults, then the optional config file, then env overrides.
    pub fn load() -> ClientResult<Self> {
        let mut cfg = match std::env::var(ENV_CONFIG_FILE) {
            Ok(path) if !path.is_empty() => Self::from_file(&PathBuf::from(path))?,
            _ => Self::default(),
        };
        cfg.apply_overrides(|k| std::env::var(k).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &std::path::Path) -> ClientResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ClientError::config(format!("cannot read {}: {}", path.display(), e)))?;
        serde_json::from_str(&text)
            .map_err(|e| ClientError::config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Apply `CAREERSCOPE_*` overrides from an arbitrary lookup (the process env in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ClientResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_API_URL) { self.api_base_url = v; }
        if let Some(v) = lookup(ENV_CREDENTIAL_FILE) { self.credential_path = PathBuf::from(v); }
        if let Some(v) = lookup(ENV_POLL_INTERVAL_MS) { self.poll_interval_ms = parse_num(ENV_POLL_INTERVAL_MS, &v)?; }
        if let Some(v) = lookup(ENV_POLL_MAX_ATTEMPTS) {
            let n: u32 = parse_num(ENV_POLL_MAX_ATTEMPTS, &v)?;
            self.poll_max_attempts = if n == 0 { None } else { Some(n) };
        }
        if let Some(v) = lookup(ENV_HTTP_TIMEOUT_MS) { self.request_timeout_ms = parse_num(ENV_HTTP_TIMEOUT_MS, &v)?; }
        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ClientError::config(format!("invalid api_base_url '{}': {}", self.api_base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::config(format!("api_base_url must be http(s), got '{}'", url.scheme())));
        }
        if self.poll_interval_ms == 0 {
            return Err(ClientError::config("poll interval must be greater than zero"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ClientError::config("request timeout must be greater than zero"));
        }
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_base_url(),
            credential_path: crate::client_paths::default_credentials_file(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            poll_max_attempts: Self::default_poll_max_attempts(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> ClientResult<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ClientError::config(format!("{} must be a non-negative integer, got '{}'", key, raw)))
}

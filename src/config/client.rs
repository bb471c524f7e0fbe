// src/config/client.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

use crate::fetch::RetryPolicy;

pub const ENV_CONFIG_PATH: &str = "SMARTSTOX_CONFIG_PATH";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}
fn default_health_path() -> String {
    "/healthz".to_string()
}
fn default_warm_up() -> bool {
    true
}
fn default_connect_timeout_secs() -> u64 {
    4
}
fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, no trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
    /// Ping the health endpoint before listing calls (backend cold start).
    #[serde(default = "default_warm_up")]
    pub warm_up: bool,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            health_path: default_health_path(),
            warm_up: default_warm_up(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Load from an explicit TOML or JSON file, then apply env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading client config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let mut cfg = parse_config(&data, &ext)
            .with_context(|| format!("parsing client config {}", path.display()))?;
        cfg.apply_env();
        cfg.sanitize();
        Ok(cfg)
    }

    /// Resolution order:
    /// 1) $SMARTSTOX_CONFIG_PATH
    /// 2) config/client.toml
    /// 3) config/client.json
    /// 4) built-in defaults
    ///
    /// Env overrides are applied in every case.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        for candidate in ["config/client.toml", "config/client.json"] {
            let pb = PathBuf::from(candidate);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
        }
        let mut cfg = Self::default();
        cfg.apply_env();
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn health_url(&self) -> String {
        self.url(&self.health_path)
    }

    /// Join a path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn apply_env(&mut self) {
        if let Ok(v) = env::var("API_URL") {
            if !v.trim().is_empty() {
                self.api_url = v.trim().to_string();
            }
        }
        if let Some(v) = env_parse::<u32>("FETCH_MAX_ERROR_RETRIES") {
            self.retry.max_error_retries = v;
        }
        if let Some(v) = env_parse::<u32>("FETCH_MAX_EMPTY_RETRIES") {
            self.retry.max_empty_retries = v;
        }
        if let Some(v) = env_parse::<u64>("FETCH_MIN_DISPLAY_MS") {
            self.retry.min_display_ms = v;
        }
        if let Some(v) = env_parse::<u64>("FETCH_BASE_BACKOFF_MS") {
            self.retry.base_backoff_ms = v;
        }
        if let Some(v) = env_parse::<u64>("FETCH_EMPTY_BACKOFF_MS") {
            self.retry.empty_backoff_ms = v;
        }
        if let Ok(v) = env::var("FETCH_WARM_UP") {
            self.warm_up = matches!(v.trim(), "1" | "true" | "yes" | "on");
        }
    }

    /// Keep values inside ranges a dashboard can live with.
    fn sanitize(&mut self) {
        self.api_url = self.api_url.trim_end_matches('/').to_string();
        if self.api_url.is_empty() {
            self.api_url = default_api_url();
        }
        if !self.health_path.starts_with('/') {
            self.health_path = format!("/{}", self.health_path);
        }
        if self.connect_timeout_secs == 0 {
            self.connect_timeout_secs = default_connect_timeout_secs();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = default_request_timeout_secs();
        }
        // 2^16 * base is already far beyond any sane wait
        self.retry.max_error_retries = self.retry.max_error_retries.min(16);
        self.retry.max_empty_retries = self.retry.max_empty_retries.min(16);
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable env override");
            None
        }
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<ClientConfig> {
    if hint_ext == "json" {
        return serde_json::from_str(s).context("invalid JSON client config");
    }
    if hint_ext == "toml" {
        return toml::from_str(s).context("invalid TOML client config");
    }
    // Unknown extension: JSON first, then TOML
    if let Ok(v) = serde_json::from_str(s) {
        return Ok(v);
    }
    toml::from_str(s).map_err(|e| anyhow!("unsupported client config format: {e}"))
}

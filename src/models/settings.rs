//! Settings Models
//!
//! Application configuration and settings data structures.

use serde::{Deserialize, Serialize};

use sentilens_core::proxy::ProxyConfig;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["API_KEY", "GEMINI_API_KEY"];

pub const ENV_BASE_URL: &str = "SENTILENS_BASE_URL";
pub const ENV_FAST_MODEL: &str = "SENTILENS_FAST_MODEL";
pub const ENV_DEEP_MODEL: &str = "SENTILENS_DEEP_MODEL";
pub const ENV_TIMEOUT_SECS: &str = "SENTILENS_TIMEOUT_SECS";

/// Application configuration stored in config.json
///
/// Holds no credential; the API key is read from the environment at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gemini API base URL override (model collection endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model used for default analysis
    #[serde(default = "default_fast_model")]
    pub fast_model: String,
    /// Higher-capability model for deep analysis and for chat
    #[serde(default = "default_deep_model")]
    pub deep_model: String,
    /// Deadline for non-streamed requests and idle limit for streams, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Outbound proxy URL, e.g. `socks5://127.0.0.1:1080`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

fn default_fast_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_deep_model() -> String {
    "gemini-3-pro-preview".to_string()
}

fn default_request_timeout_secs() -> u64 {
    180
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fast_model: default_fast_model(),
            deep_model: default_deep_model(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            proxy_url: None,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub base_url: Option<String>,
    pub fast_model: Option<String>,
    pub deep_model: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub proxy_url: Option<String>,
}

impl AppConfig {
    /// Apply a partial update to the configuration.
    ///
    /// An empty `base_url` or `proxy_url` clears the override.
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(base_url) = update.base_url {
            self.base_url = (!base_url.trim().is_empty()).then_some(base_url);
        }
        if let Some(model) = update.fast_model {
            self.fast_model = model;
        }
        if let Some(model) = update.deep_model {
            self.deep_model = model;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = update.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(proxy_url) = update.proxy_url {
            self.proxy_url = (!proxy_url.trim().is_empty()).then_some(proxy_url);
        }
    }

    /// Overlay `SENTILENS_*` environment variables.
    ///
    /// `lookup` abstracts the environment so callers (and tests) can supply
    /// their own source; pass `|k| std::env::var(k).ok()` for the process env.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.base_url = Some(url);
        }
        if let Some(model) = non_empty(ENV_FAST_MODEL) {
            self.fast_model = model;
        }
        if let Some(model) = non_empty(ENV_DEEP_MODEL) {
            self.deep_model = model;
        }
        if let Some(raw) = non_empty(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| format!("{} must be a whole number of seconds, got '{}'", ENV_TIMEOUT_SECS, raw))?;
        }
        Ok(())
    }

    /// Parsed proxy, if one is configured
    pub fn proxy(&self) -> Result<Option<ProxyConfig>, String> {
        match &self.proxy_url {
            Some(url) => ProxyConfig::parse(url).map(Some).map_err(|e| e.to_string()),
            None => Ok(None),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.fast_model.trim().is_empty() {
            return Err("fast_model cannot be empty".to_string());
        }
        if self.deep_model.trim().is_empty() {
            return Err("deep_model cannot be empty".to_string());
        }

        if let Some(url) = &self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(format!("Invalid base_url: {}. Must start with http:// or https://", url));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1 second".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be at least 1 second".to_string());
        }
        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err("connect_timeout_secs cannot exceed request_timeout_secs".to_string());
        }

        self.proxy()?;

        Ok(())
    }
}

/// Read the API key from the environment (`API_KEY`, then `GEMINI_API_KEY`).
///
/// Absence is not an error here; the first model call reports it.
pub fn api_key_from_env<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_ENV_VARS
        .iter()
        .find_map(|key| lookup(key).filter(|v| !v.trim().is_empty()))
}

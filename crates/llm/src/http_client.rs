//! HTTP Client Factory
//!
//! Builds the reqwest client used by providers, applying the proxy and the
//! explicit timeouts from the provider configuration.
//!
//! The client-wide read timeout bounds the silence between reads, so a
//! streamed answer may run longer than `request_timeout_secs` as long as data
//! keeps arriving. Non-streamed requests set their own whole-request deadline.

use std::time::Duration;

use crate::types::{LlmError, LlmResult, ProviderConfig};

/// Build a `reqwest::Client` for the given provider configuration.
///
/// - `proxy: Some(_)` -> route all traffic through that proxy
/// - `proxy: None` -> explicitly disable proxying, ignoring env vars
pub fn build_http_client(config: &ProviderConfig) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.request_timeout_secs));

    match &config.proxy {
        Some(cfg) => {
            let mut proxy = reqwest::Proxy::all(cfg.url()).map_err(|e| LlmError::InvalidRequest {
                message: format!("Invalid proxy {}: {}", cfg.url(), e),
            })?;
            if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                proxy = proxy.basic_auth(u, pw);
            }
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }

    builder.build().map_err(|e| LlmError::Other {
        message: format!("Failed to build HTTP client: {}", e),
    })
}

//! Proxy Configuration Types
//!
//! Data types for an optional outbound proxy. The HTTP client factory that
//! consumes them lives in the `sentilens-llm` crate.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Proxy protocol type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Https,
    Socks5,
}

impl ProxyProtocol {
    /// Return the URL scheme string for this protocol.
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyProtocol::Http => "http",
            ProxyProtocol::Https => "https",
            ProxyProtocol::Socks5 => "socks5",
        }
    }
}

impl std::str::FromStr for ProxyProtocol {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyProtocol::Http),
            "https" => Ok(ProxyProtocol::Https),
            "socks5" | "socks5h" => Ok(ProxyProtocol::Socks5),
            other => Err(CoreError::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProxyConfig {
    pub protocol: ProxyProtocol,
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Only held in memory; never written back to the config file.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Parse a proxy URL of the form `scheme://[user[:pass]@]host:port`.
    pub fn parse(url: &str) -> CoreResult<Self> {
        let (scheme, rest) = url
            .trim()
            .split_once("://")
            .ok_or_else(|| CoreError::invalid_url(url, "no scheme"))?;
        let protocol: ProxyProtocol = scheme.parse()?;

        let rest = rest.trim_end_matches('/');
        let (credentials, authority) = match rest.rsplit_once('@') {
            Some((creds, authority)) => (Some(creds), authority),
            None => (None, rest),
        };

        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| CoreError::invalid_url(url, "no port"))?;
        if host.is_empty() {
            return Err(CoreError::validation("Proxy host must not be empty"));
        }
        let port: u16 = port
            .parse()
            .map_err(|_| CoreError::invalid_url(url, format!("bad port {}", port)))?;
        if port == 0 {
            return Err(CoreError::validation("Proxy port must be non-zero"));
        }

        let (username, password) = match credentials {
            Some(creds) => match creds.split_once(':') {
                Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
                None => (Some(creds.to_string()), None),
            },
            None => (None, None),
        };

        Ok(Self {
            protocol,
            host: host.to_string(),
            port,
            username,
            password,
        })
    }

    /// Build the proxy URL string (without auth).
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }
}

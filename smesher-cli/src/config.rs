//! Configuration management for smesher-cli.
//!
//! The client owns very little configuration: where the node's API lives,
//! how long to wait for unary calls, and how chatty the log should be.
//! Values come from command-line flags and environment variables (see
//! `bin/cli.rs`) and are folded into [`Config`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default base URL of the node's JSON API gateway.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9093";

/// Default timeout for unary API calls, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Main configuration structure for the client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Node API configuration
    pub api: ApiConfig,

    /// Default log level, overridable with RUST_LOG
    pub log_level: String,
}

/// Node API connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the node's API gateway
    pub url: String,

    /// Timeout for unary calls. Never applied to streaming calls.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    /// Timeout for unary calls.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Parsed base URL.
    pub fn base_url(&self) -> Result<reqwest::Url> {
        reqwest::Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid API URL '{}': {}", self.url, e)))
    }
}

impl Config {
    /// Check that the configuration is usable before any request is made.
    pub fn validate(&self) -> Result<()> {
        let url = self.api.base_url()?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "unsupported API URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least one second".into()));
        }
        Ok(())
    }
}

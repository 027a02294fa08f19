use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const LOG_API_TOKEN_ENV: &str = "LOG_API_TOKEN";

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Timeout for the {0} upstream cannot be 0")]
    ZeroTimeout(&'static str),

    #[error("No API token configured for the log upstream (set log_upstream.api_token or LOG_API_TOKEN)")]
    MissingLogToken,

    #[error("Default page size must be between 1 and max_page_size")]
    InvalidPageSize,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Config provider. Serves every drone's configuration from a single URL.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ConfigUpstream {
    pub url: Url,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Log provider. A record store with filter/sort/perPage query support.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct LogUpstream {
    pub url: Url,
    /// Bearer token. Falls back to the `LOG_API_TOKEN` environment variable.
    pub api_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl LogUpstream {
    pub fn resolve_token_from_env(&mut self) {
        if self.api_token.is_none() {
            self.api_token = std::env::var(LOG_API_TOKEN_ENV)
                .ok()
                .filter(|t| !t.is_empty());
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    /// Reported by the health endpoint.
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_true")]
    pub enable_debug_routes: bool,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    pub config_upstream: ConfigUpstream,
    pub log_upstream: LogUpstream,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;

        if self.config_upstream.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("config"));
        }
        if self.log_upstream.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("log"));
        }
        if self
            .log_upstream
            .api_token
            .as_deref()
            .is_none_or(str::is_empty)
        {
            return Err(ValidationError::MissingLogToken);
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(ValidationError::InvalidPageSize);
        }

        Ok(())
    }

    pub fn config_timeout(&self) -> Duration {
        Duration::from_secs(self.config_upstream.timeout_secs)
    }

    pub fn log_timeout(&self) -> Duration {
        Duration::from_secs(self.log_upstream.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_environment() -> String {
    "development".into()
}

fn default_user_agent() -> String {
    "DroneAPI/1.0".into()
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    12
}

fn default_max_page_size() -> u32 {
    500
}

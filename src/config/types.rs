use crate::config::error::{ConfigError, ConfigResult};
use crate::poll::{PollConfig, DEFAULT_PAGE_SIZE};
use crate::rpc::ServerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default poll period in milliseconds
pub const DEFAULT_FETCH_TIME_MS: u64 = 1000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_HISTORY_DATABASE: &str = "glutton.db";

/// Application settings. Every field has a default, so an empty JSON
/// object is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Server used until the history says otherwise
    pub default_server: ServerConfig,
    /// Poll period in milliseconds
    pub fetch_time: u64,
    pub page_size: u32,
    /// Per-request timeout in milliseconds
    pub request_timeout: u64,
    pub history_database: PathBuf,
    /// Serve Prometheus metrics on this address when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_address: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_server: ServerConfig::default(),
            fetch_time: DEFAULT_FETCH_TIME_MS,
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_MS,
            history_database: PathBuf::from(DEFAULT_HISTORY_DATABASE),
            metrics_address: None,
        }
    }
}

impl AppConfig {
    /// Reject values the client cannot run with, such as a zero poll period.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch_time == 0 {
            return Err(ConfigError::Invalid("fetchTime must be positive".into()));
        }
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("pageSize must be positive".into()));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Invalid("requestTimeout must be positive".into()));
        }
        if self.default_server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("defaultServer.host is empty".into()));
        }
        if self.default_server.port == 0 {
            return Err(ConfigError::Invalid("defaultServer.port must be non-zero".into()));
        }
        Ok(())
    }

    /// Poll settings derived from `fetchTime` and `pageSize`
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.fetch_time),
            page_size: self.page_size,
        }
    }

    /// Per-request HTTP timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout)
    }
}

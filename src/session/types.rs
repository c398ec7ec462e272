use crate::rpc::ServerConfig;
use serde::{Deserialize, Serialize};

/// What observers see of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub logged_in: bool,
    pub active_server: ServerConfig,
    /// `dir` reported by the daemon at the last successful connect.
    pub default_destination: Option<String>,
}

impl SessionState {
    /// Logged-out state pointing at `active_server`
    pub fn new(active_server: ServerConfig) -> Self {
        Self {
            logged_in: false,
            active_server,
            default_destination: None,
        }
    }
}

/// Identifies the session a poll was issued under. A result carrying a
/// ticket that is no longer current must not reach the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTicket {
    pub epoch: u64,
    pub server: ServerConfig,
}

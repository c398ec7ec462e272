use crate::rpc::ServerConfig;
use crate::session::error::{SessionError, SessionResult};
use serde_json::Value;

/// Servers connected to before, most recent first, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerHistory {
    entries: Vec<ServerConfig>,
}

impl ServerHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `server` to the front, dropping any earlier equal entry.
    pub fn record(&mut self, server: ServerConfig) {
        self.entries.retain(|entry| *entry != server);
        self.entries.insert(0, server);
    }

    /// Remove `server`. Returns whether it was present.
    pub fn remove(&mut self, server: &ServerConfig) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != server);
        self.entries.len() != before
    }

    /// Forget every saved server
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Most recently connected server
    pub fn latest(&self) -> Option<&ServerConfig> {
        self.entries.first()
    }

    /// Saved servers, most recent first
    pub fn entries(&self) -> &[ServerConfig] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as the JSON array kept in local storage
    pub fn to_json(&self) -> SessionResult<String> {
        Ok(serde_json::to_string(&self.entries)?)
    }

    /// Parse a stored history, filling fields older entries lack from
    /// `defaults`. Entries that still fail to parse are skipped.
    pub fn from_json(raw: &str, defaults: &ServerConfig) -> SessionResult<Self> {
        let items = match serde_json::from_str::<Value>(raw)? {
            Value::Array(items) => items,
            other => {
                return Err(SessionError::Serialization(format!(
                    "server history must be an array, found {other}"
                )));
            }
        };

        let mut entries: Vec<ServerConfig> = Vec::with_capacity(items.len());
        for item in &items {
            match ServerConfig::overlay(defaults, item) {
                Ok(server) if !entries.contains(&server) => entries.push(server),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "skipping unreadable history entry"),
            }
        }

        Ok(Self { entries })
    }
}

impl From<Vec<ServerConfig>> for ServerHistory {
    fn from(servers: Vec<ServerConfig>) -> Self {
        let mut history = Self::new();
        for server in servers.into_iter().rev() {
            history.record(server);
        }
        history
    }
}

use crate::metrics;
use crate::poll::PollLoop;
use crate::rpc::{Aria2Method, RpcGateway, ServerConfig};
use crate::session::error::{SessionError, SessionResult};
use crate::session::history::ServerHistory;
use crate::session::store::LocalStore;
use crate::session::tracker::SessionTracker;
use crate::session::types::SessionState;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Drives login, logout and the persisted server history.
#[derive(Clone)]
pub struct SessionManager {
    gateway: RpcGateway,
    tracker: SessionTracker,
    poller: PollLoop,
    storage: LocalStore,
    history: Arc<Mutex<ServerHistory>>,
    default_server: ServerConfig,
}

impl SessionManager {
    pub fn new(
        gateway: RpcGateway,
        tracker: SessionTracker,
        poller: PollLoop,
        storage: LocalStore,
        default_server: ServerConfig,
    ) -> Self {
        Self {
            gateway,
            tracker,
            poller,
            storage,
            history: Arc::new(Mutex::new(ServerHistory::new())),
            default_server,
        }
    }

    /// Ask `server` for its global options. Nothing else changes.
    pub async fn test_connection(&self, server: &ServerConfig) -> SessionResult<Value> {
        let options = self
            .gateway
            .call(server, Aria2Method::GetGlobalOption.as_str(), vec![])
            .await?;
        Ok(options)
    }

    /// Probe `server` and make it the active session.
    ///
    /// On failure the session is left exactly as it was. Failing to persist
    /// the updated history is logged but does not undo the login.
    pub async fn connect(&self, server: ServerConfig) -> SessionResult<SessionState> {
        let options = match self.test_connection(&server).await {
            Ok(options) => options,
            Err(e) => {
                metrics::record_connect(false);
                tracing::warn!(server = %server, error = %e, "connection attempt failed");
                return Err(e);
            }
        };
        metrics::record_connect(true);

        let destination = options
            .get("dir")
            .and_then(Value::as_str)
            .map(str::to_string);
        let epoch = self.tracker.login(server.clone(), destination);
        tracing::info!(server = %server, epoch, "connected");

        {
            let mut history = self.history.lock().await;
            history.record(server);
            if let Err(e) = self.storage.save_history(&history).await {
                tracing::warn!(error = %e, "failed to persist server history");
            }
        }

        // A running loop would leave the previous session's list in the store
        // until its next period.
        if !self.poller.start() {
            self.poller.tick().await;
        }
        Ok(self.tracker.snapshot())
    }

    /// Drop the logged-in flag. History and the active server stay.
    pub fn disconnect(&self) {
        self.tracker.logout();
        tracing::info!(server = %self.tracker.active_server(), "disconnected");
    }

    /// Load the saved history and reconnect to the most recent server.
    ///
    /// Returns whether a connection was made. An unreachable server is not
    /// an error here.
    pub async fn restore(&self) -> SessionResult<bool> {
        let loaded = match self.storage.load_history(&self.default_server).await {
            Ok(history) => history,
            Err(SessionError::Serialization(e)) => {
                tracing::warn!(error = %e, "ignoring unreadable server history");
                ServerHistory::new()
            }
            Err(e) => return Err(e),
        };

        let latest = loaded.latest().cloned();
        *self.history.lock().await = loaded;

        let Some(server) = latest else {
            return Ok(false);
        };

        self.tracker.set_active_server(server.clone());
        match self.connect(server).await {
            Ok(_) => Ok(true),
            Err(SessionError::Rpc(e)) => {
                tracing::warn!(error = %e, "could not restore previous session");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Remove `server` from the history. Returns whether it was present.
    pub async fn forget(&self, server: &ServerConfig) -> SessionResult<bool> {
        let mut history = self.history.lock().await;
        let removed = history.remove(server);
        if removed {
            self.storage.save_history(&history).await?;
        }
        Ok(removed)
    }

    /// Drop every saved server and persist the empty history.
    pub async fn clear_history(&self) -> SessionResult<()> {
        let mut history = self.history.lock().await;
        history.clear();
        self.storage.save_history(&history).await
    }

    /// Saved servers, most recent first
    pub async fn history(&self) -> Vec<ServerConfig> {
        self.history.lock().await.entries().to_vec()
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.tracker.snapshot()
    }

    /// Whether a session is live
    pub fn is_logged_in(&self) -> bool {
        self.tracker.is_logged_in()
    }

    /// Receiver notified on every session state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tracker.subscribe()
    }

    /// Shared session cell, also held by the poll loop and dispatcher
    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Server used when the history is empty
    pub fn default_server(&self) -> &ServerConfig {
        &self.default_server
    }
}

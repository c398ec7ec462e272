use crate::rpc::ServerConfig;
use crate::session::types::{PollTicket, SessionState};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug)]
struct TrackerInner {
    state: SessionState,
    epoch: u64,
}

/// Shared cell holding the session state and its epoch.
///
/// The poll loop reads it to decide whether to run and whether a finished
/// poll may still be applied; the session manager is the only writer.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<RwLock<TrackerInner>>,
    updates: Arc<watch::Sender<SessionState>>,
}

impl SessionTracker {
    /// Logged-out tracker whose active server is `default_server`
    pub fn new(default_server: ServerConfig) -> Self {
        let state = SessionState::new(default_server);
        let (updates, _) = watch::channel(state.clone());
        Self {
            inner: Arc::new(RwLock::new(TrackerInner { state, epoch: 0 })),
            updates: Arc::new(updates),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.inner.read().state.clone()
    }

    /// Whether a session is live
    pub fn is_logged_in(&self) -> bool {
        self.inner.read().state.logged_in
    }

    /// Server of the current or most recent session
    pub fn active_server(&self) -> ServerConfig {
        self.inner.read().state.active_server.clone()
    }

    /// Download directory the daemon reported on connect
    pub fn default_destination(&self) -> Option<String> {
        self.inner.read().state.default_destination.clone()
    }

    /// Number of successful logins so far
    pub fn epoch(&self) -> u64 {
        self.inner.read().epoch
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.updates.subscribe()
    }

    pub(crate) fn set_active_server(&self, server: ServerConfig) {
        self.update(|inner| inner.state.active_server = server);
    }

    /// Enter the logged-in state for `server` and start a new epoch.
    pub(crate) fn login(&self, server: ServerConfig, destination: Option<String>) -> u64 {
        self.update(|inner| {
            inner.epoch += 1;
            inner.state = SessionState {
                logged_in: true,
                active_server: server,
                default_destination: destination,
            };
            inner.epoch
        })
    }

    /// Clear only the logged-in flag.
    pub(crate) fn logout(&self) {
        self.update(|inner| inner.state.logged_in = false);
    }

    /// Ticket for a poll issued now, or `None` while logged out.
    pub fn ticket(&self) -> Option<PollTicket> {
        let inner = self.inner.read();
        inner.state.logged_in.then(|| PollTicket {
            epoch: inner.epoch,
            server: inner.state.active_server.clone(),
        })
    }

    /// Run `apply` only if `ticket` still describes the live session. The
    /// check and `apply` happen under one read lock, so a concurrent login or
    /// logout cannot slip in between.
    pub fn apply_if_current<F>(&self, ticket: &PollTicket, apply: F) -> bool
    where
        F: FnOnce(),
    {
        let inner = self.inner.read();
        let current = inner.state.logged_in
            && inner.epoch == ticket.epoch
            && inner.state.active_server == ticket.server;
        if current {
            apply();
        }
        current
    }

    fn update<F, R>(&self, change: F) -> R
    where
        F: FnOnce(&mut TrackerInner) -> R,
    {
        let mut inner = self.inner.write();
        let result = change(&mut inner);
        self.updates.send_replace(inner.state.clone());
        result
    }
}

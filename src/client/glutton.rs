use crate::client::error::ClientResult;
use crate::command::CommandDispatcher;
use crate::config::AppConfig;
use crate::metrics;
use crate::poll::PollLoop;
use crate::rpc::RpcGateway;
use crate::session::{LocalStore, SessionManager, SessionState, SessionTracker};
use crate::store::{Download, DownloadStore, GlobalStat};

/// Everything needed to drive one daemon, wired together.
#[derive(Clone)]
pub struct GluttonClient {
    config: AppConfig,
    store: DownloadStore,
    poller: PollLoop,
    sessions: SessionManager,
    commands: CommandDispatcher,
}

impl GluttonClient {
    /// Build a client talking HTTP, with history in `config.history_database`.
    pub async fn from_config(config: AppConfig) -> ClientResult<Self> {
        config.validate()?;
        let gateway = RpcGateway::http(config.request_timeout())?;
        let storage = LocalStore::open(&config.history_database).await?;
        Ok(Self::with_parts(config, gateway, storage))
    }

    /// Build a client from an existing gateway and storage, e.g. in tests.
    pub fn with_parts(config: AppConfig, gateway: RpcGateway, storage: LocalStore) -> Self {
        let tracker = SessionTracker::new(config.default_server.clone());
        let store = DownloadStore::new();
        let poller = PollLoop::new(
            gateway.clone(),
            tracker.clone(),
            store.clone(),
            config.poll_config(),
        );
        let sessions = SessionManager::new(
            gateway.clone(),
            tracker.clone(),
            poller.clone(),
            storage,
            config.default_server.clone(),
        );
        let commands = CommandDispatcher::new(gateway, tracker, store.clone(), poller.clone());

        Self {
            config,
            store,
            poller,
            sessions,
            commands,
        }
    }

    /// Describe metrics and reconnect to the last server used. Returns
    /// whether a session was restored.
    pub async fn startup(&self) -> ClientResult<bool> {
        metrics::init_metrics();
        Ok(self.sessions.restore().await?)
    }

    /// Stop background polling.
    pub fn shutdown(&self) {
        self.poller.stop();
        tracing::debug!("client shut down");
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Login, logout and history
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// Start, pause, remove and add
    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    /// Downloads, stats, filter and selection
    pub fn store(&self) -> &DownloadStore {
        &self.store
    }

    pub fn poller(&self) -> &PollLoop {
        &self.poller
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.sessions.state()
    }

    pub fn is_logged_in(&self) -> bool {
        self.sessions.is_logged_in()
    }

    /// Download directory reported by the connected daemon
    pub fn default_destination(&self) -> Option<String> {
        self.sessions.state().default_destination
    }

    /// Filtered download list, gid descending
    pub fn download_list(&self) -> Vec<Download> {
        self.store.download_list()
    }

    pub fn global_stat(&self) -> GlobalStat {
        self.store.global_stat()
    }
}

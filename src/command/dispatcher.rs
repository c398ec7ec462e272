use crate::command::error::{CommandError, CommandResult};
use crate::command::gid::synthesize_gids;
use crate::command::types::{CommandReport, DownloadOptions, ItemFailure, TorrentBatch, UriBatch};
use crate::metrics;
use crate::poll::PollLoop;
use crate::rpc::{Aria2Method, RpcBatch, RpcCall, RpcFault, RpcGateway, ServerConfig};
use crate::session::SessionTracker;
use crate::store::{Download, DownloadStore};
use serde_json::{json, Value};

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Turns user intents into batched daemon calls.
///
/// Every command that reaches the daemon is followed by one out-of-cycle
/// poll tick, whether or not the batch succeeded.
#[derive(Clone)]
pub struct CommandDispatcher {
    gateway: RpcGateway,
    tracker: SessionTracker,
    store: DownloadStore,
    poller: PollLoop,
    clock: fn() -> i64,
}

impl CommandDispatcher {
    pub fn new(
        gateway: RpcGateway,
        tracker: SessionTracker,
        store: DownloadStore,
        poller: PollLoop,
    ) -> Self {
        Self {
            gateway,
            tracker,
            store,
            poller,
            clock: now_millis,
        }
    }

    /// Replace the millisecond clock used for gid synthesis.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Resume the given downloads.
    pub async fn start(&self, gids: &[String]) -> CommandResult<CommandReport> {
        self.for_each_gid("start", Aria2Method::Unpause, gids).await
    }

    /// Pause each gid in one batch, then refresh.
    pub async fn pause(&self, gids: &[String]) -> CommandResult<CommandReport> {
        self.for_each_gid("pause", Aria2Method::Pause, gids).await
    }

    /// Remove downloads. Running or paused ones are stopped; anything else
    /// has its result purged.
    pub async fn remove(&self, downloads: &[Download]) -> CommandResult<CommandReport> {
        if downloads.is_empty() {
            return Ok(CommandReport::default());
        }
        let server = self.require_server()?;

        let batch: RpcBatch = downloads
            .iter()
            .map(|download| {
                let method = if download.status.is_removable() {
                    Aria2Method::Remove
                } else {
                    Aria2Method::RemoveDownloadResult
                };
                RpcCall::aria2(method, vec![json!(download.gid)])
            })
            .collect();
        let gids = downloads.iter().map(|d| d.gid.clone()).collect();
        let sent: Vec<usize> = (0..downloads.len()).collect();

        self.submit(&server, "remove", batch, gids, &sent, Vec::new())
            .await
    }

    /// Resume every selected download
    pub async fn start_selected(&self) -> CommandResult<CommandReport> {
        self.start(&self.selected_gids()).await
    }

    /// Pause every selected download
    pub async fn pause_selected(&self) -> CommandResult<CommandReport> {
        self.pause(&self.selected_gids()).await
    }

    /// Remove the selected downloads that the current filter shows.
    pub async fn remove_selected(&self) -> CommandResult<CommandReport> {
        self.remove(&self.store.selected_downloads()).await
    }

    /// Add one download per batch item, each with a client-assigned gid.
    pub async fn add_uris(&self, batch: UriBatch) -> CommandResult<CommandReport> {
        if batch.is_empty() {
            return Ok(CommandReport::default());
        }
        if let Some(index) = batch.items.iter().position(|uris| uris.is_empty()) {
            return Err(CommandError::Validation(format!("item {index} has no URI")));
        }
        let server = self.require_server()?;
        let gids = synthesize_gids(self.timestamp(), batch.len())?;

        let rpc_batch: RpcBatch = batch
            .items
            .iter()
            .zip(&gids)
            .map(|(uris, gid)| {
                RpcCall::aria2(
                    Aria2Method::AddUri,
                    vec![json!(uris), with_gid(&batch.options, gid)],
                )
            })
            .collect();
        let sent: Vec<usize> = (0..batch.len()).collect();

        self.submit(&server, "add_uri", rpc_batch, gids, &sent, Vec::new())
            .await
    }

    /// Add torrents. Files that are not torrents are reported without being
    /// sent; the rest go out in one batch.
    pub async fn add_torrents(&self, batch: TorrentBatch) -> CommandResult<CommandReport> {
        if batch.is_empty() {
            return Ok(CommandReport::default());
        }
        let server = self.require_server()?;
        let gids = synthesize_gids(self.timestamp(), batch.len())?;

        let mut rpc_batch = RpcBatch::new();
        let mut sent = Vec::new();
        let mut failures = Vec::new();
        for (index, (torrent, gid)) in batch.torrents.iter().zip(&gids).enumerate() {
            if let Err(e) = torrent.validate() {
                failures.push(ItemFailure {
                    index,
                    gid: Some(gid.clone()),
                    message: e.to_string(),
                });
                continue;
            }
            rpc_batch.push(RpcCall::aria2(
                Aria2Method::AddTorrent,
                vec![
                    json!(torrent.to_base64()),
                    json!([]),
                    with_gid(&batch.options, gid),
                ],
            ));
            sent.push(index);
        }

        if rpc_batch.is_empty() {
            return Ok(CommandReport { gids, failures });
        }

        self.submit(&server, "add_torrent", rpc_batch, gids, &sent, failures)
            .await
    }

    async fn for_each_gid(
        &self,
        command: &'static str,
        method: Aria2Method,
        gids: &[String],
    ) -> CommandResult<CommandReport> {
        if gids.is_empty() {
            return Ok(CommandReport::default());
        }
        let server = self.require_server()?;

        let batch: RpcBatch = gids
            .iter()
            .map(|gid| RpcCall::aria2(method, vec![json!(gid)]))
            .collect();
        let sent: Vec<usize> = (0..gids.len()).collect();

        self.submit(&server, command, batch, gids.to_vec(), &sent, Vec::new())
            .await
    }

    /// Send `batch`, refresh, then map per-call faults back to input items.
    /// `sent[i]` is the input index of the batch's `i`-th call.
    async fn submit(
        &self,
        server: &ServerConfig,
        command: &'static str,
        batch: RpcBatch,
        gids: Vec<String>,
        sent: &[usize],
        mut failures: Vec<ItemFailure>,
    ) -> CommandResult<CommandReport> {
        metrics::record_command(command, batch.len());
        tracing::debug!(command, items = batch.len(), server = %server, "dispatching command");

        let result = self.gateway.multicall(server, batch).await;
        self.poller.tick().await;

        let results = result.map_err(|e| {
            tracing::warn!(command, error = %e, "command batch failed");
            CommandError::from(e)
        })?;

        for (position, value) in results.iter().enumerate() {
            let Some(fault) = RpcFault::from_value(value) else {
                continue;
            };
            let index = sent.get(position).copied().unwrap_or(position);
            tracing::warn!(command, index, error = %fault, "command item refused");
            failures.push(ItemFailure {
                index,
                gid: gids.get(index).cloned(),
                message: fault.message,
            });
        }
        failures.sort_by_key(|f| f.index);

        Ok(CommandReport { gids, failures })
    }

    fn require_server(&self) -> CommandResult<ServerConfig> {
        self.tracker
            .ticket()
            .map(|ticket| ticket.server)
            .ok_or(CommandError::NotConnected)
    }

    fn selected_gids(&self) -> Vec<String> {
        let mut gids: Vec<String> = self.store.selection().into_iter().collect();
        gids.sort_by(|a, b| b.as_bytes().cmp(a.as_bytes()));
        gids
    }

    fn timestamp(&self) -> u64 {
        (self.clock)().max(0) as u64
    }
}

fn with_gid(options: &DownloadOptions, gid: &str) -> Value {
    let mut options = options.clone();
    options.insert("gid".into(), json!(gid));
    Value::Object(options)
}

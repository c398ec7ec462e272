use crate::rpc::{Aria2Method, RpcBatch, RpcError, RpcFault, RpcResult};
use crate::store::{Download, GlobalStat};
use serde_json::{json, Value};
use std::time::Duration;

/// Period between two poll ticks unless configured otherwise
pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_millis(1000);
/// Number of waiting and stopped downloads fetched per tick
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Upper bound on waiting and stopped downloads fetched per tick
    pub page_size: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FETCH_INTERVAL,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Logged out; nothing was sent.
    Skipped,
    /// The snapshot replaced the store contents.
    Applied { downloads: usize },
    /// The session changed while the request was in flight.
    Discarded,
    Failed(RpcError),
}

impl PollOutcome {
    /// Short name used as the `outcome` metric label
    pub fn label(&self) -> &'static str {
        match self {
            PollOutcome::Skipped => "skipped",
            PollOutcome::Applied { .. } => "applied",
            PollOutcome::Discarded => "discarded",
            PollOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, PollOutcome::Applied { .. })
    }
}

/// Daemon state gathered by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PollSnapshot {
    pub stat: GlobalStat,
    /// Active, then waiting, then stopped, each in daemon order.
    pub downloads: Vec<Download>,
}

impl PollSnapshot {
    /// The four calls one tick sends.
    pub fn batch(page_size: u32) -> RpcBatch {
        RpcBatch::new()
            .with(Aria2Method::GetGlobalStat, vec![])
            .with(Aria2Method::TellActive, vec![])
            .with(Aria2Method::TellWaiting, vec![json!(0), json!(page_size)])
            .with(Aria2Method::TellStopped, vec![json!(0), json!(page_size)])
    }

    /// Decode the results of [`PollSnapshot::batch`]. Any per-call fault
    /// fails the whole snapshot.
    pub fn from_results(results: Vec<Value>) -> RpcResult<Self> {
        if results.len() != 4 {
            return Err(RpcError::MalformedResponse(format!(
                "expected 4 poll results, got {}",
                results.len()
            )));
        }
        if let Some(fault) = results.iter().find_map(RpcFault::from_value) {
            return Err(fault.into());
        }

        let mut results = results.into_iter();
        let stat: GlobalStat = match results.next() {
            Some(value) => serde_json::from_value(value)?,
            None => GlobalStat::default(),
        };

        let mut downloads = Vec::new();
        for list in results {
            let mut page: Vec<Download> = serde_json::from_value(list)?;
            downloads.append(&mut page);
        }

        Ok(Self { stat, downloads })
    }
}

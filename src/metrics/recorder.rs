//! Metrics recorder for daemon polling and commands

use crate::store::GlobalStat;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initialize metric descriptions (call once at startup)
pub fn init_metrics() {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }

    describe_counter!(
        "glutton_poll_ticks_total",
        "Poll ticks, labelled by outcome"
    );
    describe_counter!(
        "glutton_rpc_batches_total",
        "Multicall round-trips sent to the daemon"
    );
    describe_counter!(
        "glutton_rpc_calls_total",
        "Logical RPC calls sent, counting each multicall entry"
    );
    describe_counter!(
        "glutton_commands_total",
        "User commands dispatched, labelled by command"
    );
    describe_counter!(
        "glutton_connect_attempts_total",
        "Connection attempts, labelled by result"
    );

    describe_gauge!("glutton_downloads", "Downloads in the last applied snapshot");
    describe_gauge!(
        "glutton_download_speed_bytes",
        "Aggregate download speed reported by the daemon"
    );
    describe_gauge!(
        "glutton_upload_speed_bytes",
        "Aggregate upload speed reported by the daemon"
    );

    describe_histogram!(
        "glutton_poll_duration_seconds",
        "Time from sending a poll batch to applying its result"
    );
}

// ============== RPC ==============

/// Record a single call sent outside a batch
pub fn record_rpc_call(calls: usize) {
    counter!("glutton_rpc_calls_total").increment(calls as u64);
}

/// Record one multicall round-trip carrying `calls` entries
pub fn record_rpc_batch(calls: usize) {
    counter!("glutton_rpc_batches_total").increment(1);
    counter!("glutton_rpc_calls_total").increment(calls as u64);
}

// ============== Session & Polling ==============

/// Count one poll tick under its outcome label
pub fn record_poll(outcome: &str) {
    counter!("glutton_poll_ticks_total", "outcome" => outcome.to_string()).increment(1);
}

/// Count a connection attempt by result
pub fn record_connect(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!("glutton_connect_attempts_total", "result" => result).increment(1);
}

/// Update gauges from a freshly applied snapshot
pub fn record_snapshot(stat: &GlobalStat, downloads: usize) {
    gauge!("glutton_downloads").set(downloads as f64);
    gauge!("glutton_download_speed_bytes").set(stat.download_speed as f64);
    gauge!("glutton_upload_speed_bytes").set(stat.upload_speed as f64);
}

// ============== Commands ==============

/// Count one dispatched command and the items it carried
pub fn record_command(command: &'static str, items: usize) {
    counter!("glutton_commands_total", "command" => command).increment(items as u64);
}

/// Times one poll round-trip
pub struct PollTimer {
    start_time: Instant,
}

impl PollTimer {
    /// Start timing a poll
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Stop timing and record the duration
    pub fn stop(self) {
        histogram!("glutton_poll_duration_seconds").record(self.elapsed().as_secs_f64());
    }
}

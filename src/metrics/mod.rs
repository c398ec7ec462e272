//! Metrics and observability module
//!
//! Records client-side counters and gauges through the `metrics` facade.
//! Nothing is exported unless a recorder is installed, for example with
//! [`start_metrics_exporter`].
//!
//! Key metrics:
//! - Poll ticks by outcome
//! - RPC round-trips and logical calls
//! - Commands issued and connection attempts
//! - Download count and aggregate speeds from the last applied snapshot

pub mod exporter;
pub mod recorder;

pub use exporter::{start_metrics_exporter, MetricsError};
pub use recorder::{
    init_metrics, record_command, record_connect, record_poll, record_rpc_batch, record_rpc_call,
    record_snapshot, PollTimer,
};

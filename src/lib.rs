//! Glutton: client-side state synchronization for an aria2-style download daemon.
//!
//! The crate polls a remote daemon over JSON-RPC, batches calls into single
//! `system.multicall` round-trips, keeps a filtered and sorted view of the
//! daemon's downloads, and manages the connection/session lifecycle.

pub mod client;
pub mod command;
pub mod config;
pub mod metrics;
pub mod poll;
pub mod rpc;
pub mod session;
pub mod store;

pub use client::{ClientError, ClientResult, GluttonClient};
pub use config::AppConfig;
pub use rpc::{RpcError, ServerConfig};

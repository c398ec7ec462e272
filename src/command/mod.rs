//! User commands against the active daemon

pub mod dispatcher;
pub mod error;
pub mod gid;
pub mod types;

pub use dispatcher::CommandDispatcher;
pub use error::{CommandError, CommandResult};
pub use gid::{synthesize_gid, synthesize_gids, MAX_BATCH_ITEMS};
pub use types::{CommandReport, DownloadOptions, ItemFailure, TorrentBatch, TorrentSource, UriBatch};

//! Download state store and the views derived from it

pub mod state;
pub mod types;
pub mod view;

pub use state::DownloadStore;
pub use types::{Download, DownloadFile, DownloadStatus, FileUri, GlobalStat, StoreEvent};
pub use view::{compare_gid_desc, derive_list, derive_selected};

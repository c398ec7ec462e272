//! Connection state and server history

pub mod error;
pub mod history;
pub mod manager;
pub mod store;
pub mod tracker;
pub mod types;

pub use error::{SessionError, SessionResult};
pub use history::ServerHistory;
pub use manager::SessionManager;
pub use store::{LocalStore, HISTORY_STORAGE_KEY};
pub use tracker::SessionTracker;
pub use types::{PollTicket, SessionState};

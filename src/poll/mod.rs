//! Timer-driven refresh of download state

pub mod poller;
pub mod types;

pub use poller::PollLoop;
pub use types::{PollConfig, PollOutcome, PollSnapshot, DEFAULT_FETCH_INTERVAL, DEFAULT_PAGE_SIZE};

//! Application configuration

pub mod error;
pub mod loader;
pub mod types;

pub use error::{ConfigError, ConfigResult};
pub use loader::CONFIG_ENV_VAR;
pub use types::AppConfig;

//! Client facade wiring the engine together

pub mod error;
pub mod glutton;

pub use error::{ClientError, ClientResult};
pub use glutton::GluttonClient;

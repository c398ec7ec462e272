use crate::rpc::RpcError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Not connected to a daemon")]
    NotConnected,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Too many items in one batch: {count} (max {max})")]
    TooManyItems { count: usize, max: usize },

    #[error("Daemon error: {0}")]
    Rpc(#[from] RpcError),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Io(err.to_string())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

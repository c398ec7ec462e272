use crate::command::CommandError;
use crate::config::ConfigError;
use crate::rpc::RpcError;
use crate::session::SessionError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

pub type ClientResult<T> = Result<T, ClientError>;

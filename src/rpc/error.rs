use crate::rpc::types::RpcFault;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC fault {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl RpcError {
    /// True when the daemon could not be reached at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, RpcError::Transport(_))
    }
}

impl From<reqwest::Error> for RpcError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RpcError::Transport(format!("request timed out: {err}"))
        } else if err.is_decode() {
            RpcError::MalformedResponse(err.to_string())
        } else {
            RpcError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::MalformedResponse(err.to_string())
    }
}

impl From<RpcFault> for RpcError {
    fn from(fault: RpcFault) -> Self {
        RpcError::Protocol {
            code: fault.code,
            message: fault.message,
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;

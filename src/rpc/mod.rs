pub mod error;
pub mod gateway;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{RpcError, RpcResult};
pub use gateway::RpcGateway;
pub use transport::{HttpTransport, RpcTransport};
pub use types::{Aria2Method, RpcBatch, RpcCall, RpcFault, ServerConfig, MULTICALL_METHOD};

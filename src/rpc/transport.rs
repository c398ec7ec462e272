use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::types::{RpcFault, ServerConfig};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Sends one JSON-RPC request and returns its `result`.
///
/// Implementations report unreachable daemons as [`RpcError::Transport`] and
/// JSON-RPC error objects as [`RpcError::Protocol`].
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(
        &self,
        server: &ServerConfig,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value>;
}

/// JSON-RPC 2.0 over HTTP POST.
pub struct HttpTransport {
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Build a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> RpcResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(
        &self,
        server: &ServerConfig,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": format!("glutton-{id}"),
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(server.endpoint())
            .json(&envelope)
            .send()
            .await?;

        let status = response.status();
        let body: Value = match response.json().await {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Transport(format!("HTTP {status}")));
            }
            Err(e) => return Err(e.into()),
        };

        // aria2 answers some faults with a non-2xx status and a JSON-RPC error body
        if let Some(error) = body.get("error") {
            let fault = RpcFault::from_value(error).unwrap_or_else(|| {
                RpcFault::new(-1, error.to_string())
            });
            return Err(fault.into());
        }

        if !status.is_success() {
            return Err(RpcError::Transport(format!("HTTP {status}")));
        }

        body.get("result")
            .cloned()
            .ok_or_else(|| RpcError::MalformedResponse("response has no result".into()))
    }
}

use crate::metrics;
use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::transport::{HttpTransport, RpcTransport};
use crate::rpc::types::{RpcBatch, ServerConfig, MULTICALL_METHOD};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Entry point for every call made to a daemon.
#[derive(Clone)]
pub struct RpcGateway {
    transport: Arc<dyn RpcTransport>,
}

impl RpcGateway {
    /// Gateway over any transport, e.g. an in-memory one in tests
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Gateway over HTTP with the given per-request timeout
    pub fn http(timeout: Duration) -> RpcResult<Self> {
        Ok(Self::new(Arc::new(HttpTransport::new(timeout)?)))
    }

    /// Send a single call.
    pub async fn call(
        &self,
        server: &ServerConfig,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value> {
        tracing::debug!(server = %server, method, "rpc call");
        metrics::record_rpc_call(1);
        self.transport
            .request(server, method, with_token(server, params))
            .await
    }

    /// Send every call of `batch` in one `system.multicall` round-trip.
    ///
    /// The returned values line up with the batch's calls. A per-call fault
    /// comes back as its `{code, message}` object rather than failing the
    /// batch; use [`RpcFault::from_value`](crate::rpc::RpcFault::from_value)
    /// to tell them apart.
    pub async fn multicall(
        &self,
        server: &ServerConfig,
        batch: impl Into<RpcBatch>,
    ) -> RpcResult<Vec<Value>> {
        let batch = batch.into();
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let expected = batch.len();
        let calls: Vec<Value> = batch
            .calls()
            .iter()
            .map(|call| {
                json!({
                    "methodName": call.method_name,
                    "params": with_token(server, call.params.clone()),
                })
            })
            .collect();

        tracing::debug!(server = %server, calls = expected, "rpc multicall");
        metrics::record_rpc_batch(expected);

        let result = self
            .transport
            .request(server, MULTICALL_METHOD, vec![Value::Array(calls)])
            .await?;

        let items = match result {
            Value::Array(items) => items,
            other => {
                return Err(RpcError::MalformedResponse(format!(
                    "multicall returned {other} instead of an array"
                )));
            }
        };

        if items.len() != expected {
            return Err(RpcError::MalformedResponse(format!(
                "multicall returned {} results for {} calls",
                items.len(),
                expected
            )));
        }

        Ok(items.into_iter().map(unwrap_item).collect())
    }
}

fn with_token(server: &ServerConfig, mut params: Vec<Value>) -> Vec<Value> {
    if !server.secret.is_empty() {
        params.insert(0, Value::String(format!("token:{}", server.secret)));
    }
    params
}

// Successful multicall entries are wrapped in a one-element array.
fn unwrap_item(item: Value) -> Value {
    match item {
        Value::Array(mut inner) if inner.len() == 1 => inner.remove(0),
        other => other,
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Method name aria2 exposes for batching several calls into one request.
pub const MULTICALL_METHOD: &str = "system.multicall";

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 6800;
pub const DEFAULT_RPC_PATH: &str = "/jsonrpc";

/// Connection parameters for one daemon. Two configs are the same server
/// exactly when every field is equal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: u16,
    pub secret: String,
    pub secure: bool,
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            secret: String::new(),
            secure: false,
            path: DEFAULT_RPC_PATH.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Set the RPC secret sent as `token:<secret>`
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Use `https` instead of `http`
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Full URL of the JSON-RPC endpoint
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let path = if self.path.is_empty() {
            DEFAULT_RPC_PATH.to_string()
        } else if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        };
        format!("{scheme}://{}:{}{path}", self.host, self.port)
    }

    /// Build a config from a stored JSON object, taking any field it lacks
    /// from `defaults`.
    pub fn overlay(defaults: &ServerConfig, stored: &Value) -> Result<Self, serde_json::Error> {
        let mut merged = serde_json::to_value(defaults)?;
        match (&mut merged, stored) {
            (Value::Object(base), Value::Object(fields)) => {
                for (key, value) in fields {
                    base.insert(key.clone(), value.clone());
                }
                serde_json::from_value(merged)
            }
            _ => serde_json::from_value(stored.clone()),
        }
    }
}

impl fmt::Display for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// Older front-ends stored the port as the string typed into a form field.
fn port_from_number_or_string<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid port: {text}"))),
    }
}

/// The subset of the aria2 RPC surface this client drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aria2Method {
    GetGlobalOption,
    GetGlobalStat,
    TellActive,
    TellWaiting,
    TellStopped,
    Unpause,
    Pause,
    Remove,
    RemoveDownloadResult,
    AddUri,
    AddTorrent,
}

impl Aria2Method {
    /// Method name on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Aria2Method::GetGlobalOption => "aria2.getGlobalOption",
            Aria2Method::GetGlobalStat => "aria2.getGlobalStat",
            Aria2Method::TellActive => "aria2.tellActive",
            Aria2Method::TellWaiting => "aria2.tellWaiting",
            Aria2Method::TellStopped => "aria2.tellStopped",
            Aria2Method::Unpause => "aria2.unpause",
            Aria2Method::Pause => "aria2.pause",
            Aria2Method::Remove => "aria2.remove",
            Aria2Method::RemoveDownloadResult => "aria2.removeDownloadResult",
            Aria2Method::AddUri => "aria2.addUri",
            Aria2Method::AddTorrent => "aria2.addTorrent",
        }
    }
}

impl fmt::Display for Aria2Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical call inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCall {
    pub method_name: String,
    pub params: Vec<Value>,
}

impl RpcCall {
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method_name: method_name.into(),
            params,
        }
    }

    /// Call to one of the known aria2 methods
    pub fn aria2(method: Aria2Method, params: Vec<Value>) -> Self {
        Self::new(method.as_str(), params)
    }
}

/// Ordered list of calls sent as a single round-trip. Result order always
/// matches the order calls were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RpcBatch {
    calls: Vec<RpcCall>,
}

impl RpcBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a batch from `(method, params)` pairs, keeping insertion order.
    ///
    /// `params` follows the loose conventions of a method-to-params mapping:
    /// `null` means no parameters, an array is used as-is, and any other
    /// value becomes the single parameter.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        pairs
            .into_iter()
            .map(|(method, params)| {
                let params = match params {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items,
                    other => vec![other],
                };
                RpcCall::new(method, params)
            })
            .collect()
    }

    /// Append a call; its result comes back at the same position
    pub fn push(&mut self, call: RpcCall) -> &mut Self {
        self.calls.push(call);
        self
    }

    /// Builder form of [`push`](Self::push) for a known method
    pub fn with(mut self, method: Aria2Method, params: Vec<Value>) -> Self {
        self.calls.push(RpcCall::aria2(method, params));
        self
    }

    /// Calls in send order
    pub fn calls(&self) -> &[RpcCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

impl FromIterator<RpcCall> for RpcBatch {
    fn from_iter<T: IntoIterator<Item = RpcCall>>(iter: T) -> Self {
        Self {
            calls: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<RpcCall>> for RpcBatch {
    fn from(calls: Vec<RpcCall>) -> Self {
        Self { calls }
    }
}

/// Error object the daemon reports for a single call, either as the whole
/// response or as one entry of a multicall result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

impl RpcFault {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Recognise a fault object. Accepts JSON-RPC (`code`/`message`) and
    /// XML-RPC style (`faultCode`/`faultString`) keys.
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Self::from_keys(map, "code", "message").or_else(|| Self::from_keys(map, "faultCode", "faultString"))
    }

    fn from_keys(map: &Map<String, Value>, code_key: &str, message_key: &str) -> Option<Self> {
        let code = match map.get(code_key)? {
            Value::Number(n) => n.as_i64()?,
            Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        let message = map.get(message_key)?.as_str()?.to_string();
        Some(Self { code, message })
    }
}

impl fmt::Display for RpcFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

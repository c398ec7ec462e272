//! In-memory stand-in for an aria2 daemon, used by unit tests.

use crate::rpc::error::{RpcError, RpcResult};
use crate::rpc::transport::RpcTransport;
use crate::rpc::types::{RpcFault, ServerConfig, MULTICALL_METHOD};
use crate::store::DownloadStatus;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub server: ServerConfig,
    pub method: String,
    pub params: Vec<Value>,
}

pub(crate) struct FakeDaemon {
    secret: String,
    downloads: Mutex<Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    sub_calls: Mutex<Vec<(String, Vec<Value>)>>,
    offline: AtomicBool,
    gate: tokio::sync::Mutex<()>,
}

impl FakeDaemon {
    pub fn new() -> Arc<Self> {
        Self::with_secret("")
    }

    pub fn with_secret(secret: &str) -> Arc<Self> {
        Arc::new(Self {
            secret: secret.to_string(),
            downloads: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            sub_calls: Mutex::new(Vec::new()),
            offline: AtomicBool::new(false),
            gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn insert(&self, gid: &str, status: DownloadStatus, path: &str) {
        self.downloads.lock().push(download_value(gid, status, path, &[]));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// While the returned guard is alive every request blocks before answering.
    pub async fn hold(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Params of every call to `method`, whether sent alone or inside a multicall
    pub fn sub_calls(&self, method: &str) -> Vec<Vec<Value>> {
        self.sub_calls
            .lock()
            .iter()
            .filter(|(name, _)| name == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn status_of(&self, gid: &str) -> Option<String> {
        self.downloads
            .lock()
            .iter()
            .find(|d| d["gid"] == gid)
            .and_then(|d| d["status"].as_str().map(str::to_string))
    }

    pub fn contains(&self, gid: &str) -> bool {
        self.status_of(gid).is_some()
    }

    fn dispatch(&self, method: &str, mut params: Vec<Value>) -> Result<Value, RpcFault> {
        self.sub_calls.lock().push((method.to_string(), params.clone()));

        if !self.secret.is_empty() {
            let expected = format!("token:{}", self.secret);
            match params.first() {
                Some(Value::String(token)) if *token == expected => {
                    params.remove(0);
                }
                _ => return Err(RpcFault::new(1, "Unauthorized")),
            }
        }

        match method {
            "aria2.getGlobalOption" => Ok(json!({
                "dir": "/downloads",
                "max-concurrent-downloads": "5",
            })),
            "aria2.getGlobalStat" => {
                let downloads = self.downloads.lock();
                let count = |statuses: &[&str]| {
                    downloads
                        .iter()
                        .filter(|d| statuses.contains(&d["status"].as_str().unwrap_or("")))
                        .count()
                        .to_string()
                };
                Ok(json!({
                    "downloadSpeed": "2048",
                    "uploadSpeed": "512",
                    "numActive": count(&["active"]),
                    "numWaiting": count(&["waiting", "paused"]),
                    "numStopped": count(&["error", "complete", "removed"]),
                    "numStoppedTotal": count(&["error", "complete", "removed"]),
                }))
            }
            "aria2.tellActive" => Ok(self.list(&["active"], 0, usize::MAX)),
            "aria2.tellWaiting" => {
                let (offset, num) = page(&params);
                Ok(self.list(&["waiting", "paused"], offset, num))
            }
            "aria2.tellStopped" => {
                let (offset, num) = page(&params);
                Ok(self.list(&["error", "complete", "removed"], offset, num))
            }
            "aria2.pause" => self.transition(&params, &["active", "waiting"], "paused"),
            "aria2.unpause" => self.transition(&params, &["paused"], "waiting"),
            "aria2.remove" => self.transition(&params, &["active", "waiting", "paused"], "removed"),
            "aria2.removeDownloadResult" => {
                let gid = gid_param(&params)?;
                let mut downloads = self.downloads.lock();
                let before = downloads.len();
                downloads.retain(|d| {
                    !(d["gid"] == gid
                        && matches!(d["status"].as_str(), Some("complete" | "error" | "removed")))
                });
                if downloads.len() == before {
                    return Err(RpcFault::new(1, format!("Could not remove download result of GID#{gid}")));
                }
                Ok(json!("OK"))
            }
            "aria2.addUri" => {
                let uris: Vec<String> = params
                    .first()
                    .and_then(Value::as_array)
                    .map(|uris| uris.iter().filter_map(|u| u.as_str().map(str::to_string)).collect())
                    .unwrap_or_default();
                if uris.is_empty() {
                    return Err(RpcFault::new(1, "No URI to download."));
                }
                let gid = self.claim_gid(params.get(1))?;
                self.downloads
                    .lock()
                    .push(download_value(&gid, DownloadStatus::Waiting, "", &uris));
                Ok(json!(gid))
            }
            "aria2.addTorrent" => {
                let content = params
                    .first()
                    .and_then(Value::as_str)
                    .and_then(|b64| BASE64.decode(b64).ok())
                    .ok_or_else(|| RpcFault::new(1, "Bad torrent encoding"))?;
                if !content.windows(6).any(|w| w == b"4:info") {
                    return Err(RpcFault::new(1, "Torrent file is missing info dictionary"));
                }
                let gid = self.claim_gid(params.get(2))?;
                let path = format!("/downloads/{gid}.bin");
                self.downloads
                    .lock()
                    .push(download_value(&gid, DownloadStatus::Active, &path, &[]));
                Ok(json!(gid))
            }
            other => Err(RpcFault::new(1, format!("No such method: {other}"))),
        }
    }

    fn list(&self, statuses: &[&str], offset: usize, num: usize) -> Value {
        let items: Vec<Value> = self
            .downloads
            .lock()
            .iter()
            .filter(|d| statuses.contains(&d["status"].as_str().unwrap_or("")))
            .skip(offset)
            .take(num)
            .cloned()
            .collect();
        Value::Array(items)
    }

    fn transition(&self, params: &[Value], from: &[&str], to: &str) -> Result<Value, RpcFault> {
        let gid = gid_param(params)?;
        let mut downloads = self.downloads.lock();
        let download = downloads
            .iter_mut()
            .find(|d| d["gid"] == gid)
            .ok_or_else(|| RpcFault::new(1, format!("GID {gid} is not found")))?;
        if !from.contains(&download["status"].as_str().unwrap_or("")) {
            return Err(RpcFault::new(1, format!("GID#{gid} cannot be changed to {to}")));
        }
        download["status"] = json!(to);
        Ok(json!(gid))
    }

    fn claim_gid(&self, options: Option<&Value>) -> Result<String, RpcFault> {
        let gid = options
            .and_then(|o| o.get("gid"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:016x}", self.downloads.lock().len() + 1));
        if self.contains(&gid) {
            return Err(RpcFault::new(1, format!("GID#{gid} is not unique")));
        }
        Ok(gid)
    }
}

#[async_trait]
impl RpcTransport for FakeDaemon {
    async fn request(
        &self,
        server: &ServerConfig,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value> {
        self.requests.lock().push(RecordedRequest {
            server: server.clone(),
            method: method.to_string(),
            params: params.clone(),
        });

        let _gate = self.gate.lock().await;

        if self.offline.load(Ordering::SeqCst) {
            return Err(RpcError::Transport("connection refused".into()));
        }

        if method != MULTICALL_METHOD {
            return self.dispatch(method, params).map_err(RpcError::from);
        }

        let calls = params
            .first()
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| RpcError::from(RpcFault::new(1, "multicall expects an array")))?;

        let results = calls
            .into_iter()
            .map(|call| {
                let name = call["methodName"].as_str().unwrap_or_default().to_string();
                let params = call["params"].as_array().cloned().unwrap_or_default();
                match self.dispatch(&name, params) {
                    Ok(value) => json!([value]),
                    Err(fault) => json!({"code": fault.code, "message": fault.message}),
                }
            })
            .collect();

        Ok(Value::Array(results))
    }
}

fn download_value(gid: &str, status: DownloadStatus, path: &str, uris: &[String]) -> Value {
    let uris: Vec<Value> = uris
        .iter()
        .map(|uri| json!({"uri": uri, "status": "waiting"}))
        .collect();
    json!({
        "gid": gid,
        "status": status.as_str(),
        "totalLength": "1048576",
        "completedLength": "524288",
        "uploadLength": "0",
        "downloadSpeed": "1024",
        "uploadSpeed": "0",
        "connections": "1",
        "dir": "/downloads",
        "files": [{
            "index": "1",
            "path": path,
            "length": "1048576",
            "completedLength": "524288",
            "selected": "true",
            "uris": uris,
        }],
    })
}

fn gid_param(params: &[Value]) -> Result<String, RpcFault> {
    params
        .first()
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RpcFault::new(1, "GID is required"))
}

fn page(params: &[Value]) -> (usize, usize) {
    let offset = params.first().and_then(Value::as_u64).unwrap_or(0) as usize;
    let num = params.get(1).and_then(Value::as_u64).unwrap_or(u64::MAX) as usize;
    (offset, num)
}

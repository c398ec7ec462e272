//! Minimal aria2 JSON-RPC endpoint served over HTTP for integration tests.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
pub struct DaemonState {
    secret: String,
    downloads: Mutex<Vec<Value>>,
    requests: Mutex<usize>,
}

impl DaemonState {
    pub fn insert(&self, gid: &str, status: &str, path: &str) {
        self.downloads
            .lock()
            .push(download(gid, status, path, None));
    }

    pub fn status_of(&self, gid: &str) -> Option<String> {
        self.downloads
            .lock()
            .iter()
            .find(|d| d["gid"] == gid)
            .and_then(|d| d["status"].as_str().map(str::to_string))
    }

    pub fn request_count(&self) -> usize {
        *self.requests.lock()
    }

    fn dispatch(&self, method: &str, mut params: Vec<Value>) -> Result<Value, Value> {
        if !self.secret.is_empty() {
            let expected = format!("token:{}", self.secret);
            if params.first().and_then(Value::as_str) != Some(expected.as_str()) {
                return Err(json!({"code": 1, "message": "Unauthorized"}));
            }
            params.remove(0);
        }

        let mut downloads = self.downloads.lock();

        match method {
            "aria2.getGlobalOption" => Ok(json!({"dir": "/srv/downloads"})),
            "aria2.getGlobalStat" => {
                let count = |statuses: &[&str]| with_status(&downloads, statuses).len().to_string();
                Ok(json!({
                    "downloadSpeed": "4096",
                    "uploadSpeed": "0",
                    "numActive": count(&["active"]),
                    "numWaiting": count(&["waiting", "paused"]),
                    "numStopped": count(&["complete", "error", "removed"]),
                }))
            }
            "aria2.tellActive" => Ok(Value::Array(with_status(&downloads, &["active"]))),
            "aria2.tellWaiting" => Ok(Value::Array(with_status(&downloads, &["waiting", "paused"]))),
            "aria2.tellStopped" => Ok(Value::Array(with_status(&downloads, &["complete", "error", "removed"]))),
            "aria2.pause" | "aria2.unpause" | "aria2.remove" => {
                let gid = params.first().cloned().unwrap_or_default();
                let next = match method {
                    "aria2.pause" => "paused",
                    "aria2.unpause" => "waiting",
                    _ => "removed",
                };
                match downloads.iter_mut().find(|d| d["gid"] == gid) {
                    Some(d) => {
                        d["status"] = json!(next);
                        Ok(gid)
                    }
                    None => Err(json!({"code": 1, "message": format!("GID {gid} is not found")})),
                }
            }
            "aria2.removeDownloadResult" => {
                let gid = params.first().cloned().unwrap_or_default();
                downloads.retain(|d| d["gid"] != gid);
                Ok(json!("OK"))
            }
            "aria2.addUri" => {
                let uri = params[0][0].as_str().unwrap_or_default().to_string();
                let gid = params[1]["gid"].as_str().unwrap_or_default().to_string();
                downloads.push(download(&gid, "waiting", "", Some(&uri)));
                Ok(json!(gid))
            }
            other => Err(json!({"code": 1, "message": format!("No such method: {other}")})),
        }
    }
}

fn with_status(downloads: &[Value], statuses: &[&str]) -> Vec<Value> {
    downloads
        .iter()
        .filter(|d| statuses.contains(&d["status"].as_str().unwrap_or("")))
        .cloned()
        .collect()
}

fn download(gid: &str, status: &str, path: &str, uri: Option<&str>) -> Value {
    let uris: Vec<Value> = uri
        .map(|u| json!({"uri": u, "status": "waiting"}))
        .into_iter()
        .collect();
    json!({
        "gid": gid,
        "status": status,
        "totalLength": "100",
        "completedLength": "40",
        "downloadSpeed": "10",
        "uploadSpeed": "0",
        "dir": "/srv/downloads",
        "files": [{"index": "1", "path": path, "length": "100",
                   "completedLength": "40", "selected": "true", "uris": uris}],
    })
}

async fn handle(
    State(state): State<Arc<DaemonState>>,
    Json(envelope): Json<Value>,
) -> (StatusCode, Json<Value>) {
    *state.requests.lock() += 1;

    let id = envelope["id"].clone();
    let method = envelope["method"].as_str().unwrap_or_default();
    let params = envelope["params"].as_array().cloned().unwrap_or_default();

    let outcome = if method == "system.multicall" {
        let calls = params
            .first()
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let results: Vec<Value> = calls
            .iter()
            .map(|call| {
                let name = call["methodName"].as_str().unwrap_or_default();
                let params = call["params"].as_array().cloned().unwrap_or_default();
                match state.dispatch(name, params) {
                    Ok(value) => json!([value]),
                    Err(fault) => fault,
                }
            })
            .collect();
        Ok(Value::Array(results))
    } else {
        state.dispatch(method, params)
    };

    match outcome {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({"jsonrpc": "2.0", "id": id, "result": result})),
        ),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"jsonrpc": "2.0", "id": id, "error": error})),
        ),
    }
}

/// Serve a fake daemon on a random local port.
pub async fn spawn_daemon(secret: &str) -> (SocketAddr, Arc<DaemonState>) {
    let state = Arc::new(DaemonState {
        secret: secret.to_string(),
        ..Default::default()
    });

    let app = Router::new()
        .route("/jsonrpc", post(handle))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, state)
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Lifecycle state the daemon reports for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Active,
    Waiting,
    Paused,
    Error,
    Complete,
    Removed,
}

impl DownloadStatus {
    /// Status name as aria2 reports it
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStatus::Active => "active",
            DownloadStatus::Waiting => "waiting",
            DownloadStatus::Paused => "paused",
            DownloadStatus::Error => "error",
            DownloadStatus::Complete => "complete",
            DownloadStatus::Removed => "removed",
        }
    }

    /// Whether the download is still held by the daemon and must be removed
    /// with `aria2.remove` rather than having its result purged.
    pub fn is_removable(&self) -> bool {
        matches!(self, DownloadStatus::Active | DownloadStatus::Paused)
    }

    /// Finished, failed or removed
    pub fn is_stopped(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Error | DownloadStatus::Complete | DownloadStatus::Removed
        )
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUri {
    pub uri: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadFile {
    pub index: String,
    pub path: String,
    pub length: String,
    pub completed_length: String,
    pub selected: String,
    pub uris: Vec<FileUri>,
}

/// One download as reported by `tellActive` / `tellWaiting` / `tellStopped`.
///
/// Numeric fields stay in the daemon's decimal-string form; use the typed
/// accessors to read them. Fields this type does not name are kept in
/// `extra` so nothing the daemon sends is lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Download {
    pub gid: String,
    pub status: DownloadStatus,
    #[serde(default)]
    pub files: Vec<DownloadFile>,
    #[serde(default)]
    pub total_length: String,
    #[serde(default)]
    pub completed_length: String,
    #[serde(default)]
    pub upload_length: String,
    #[serde(default)]
    pub download_speed: String,
    #[serde(default)]
    pub upload_speed: String,
    #[serde(default)]
    pub connections: String,
    #[serde(default)]
    pub dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_seeders: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bittorrent: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Download {
    pub fn new(gid: impl Into<String>, status: DownloadStatus) -> Self {
        Self {
            gid: gid.into(),
            status,
            files: Vec::new(),
            total_length: String::new(),
            completed_length: String::new(),
            upload_length: String::new(),
            download_speed: String::new(),
            upload_speed: String::new(),
            connections: String::new(),
            dir: String::new(),
            error_code: None,
            error_message: None,
            info_hash: None,
            num_seeders: None,
            bittorrent: None,
            extra: Map::new(),
        }
    }

    /// Set the path of the first file
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.files.push(DownloadFile {
            index: (self.files.len() + 1).to_string(),
            path: path.into(),
            ..Default::default()
        });
        self
    }

    /// Path of the first file, if the daemon has assigned one yet.
    pub fn primary_path(&self) -> Option<&str> {
        self.files
            .first()
            .map(|f| f.path.as_str())
            .filter(|p| !p.is_empty())
    }

    /// Display name: the torrent name if known, else the last path segment,
    /// else the first URI.
    pub fn name(&self) -> String {
        let torrent_name = self
            .bittorrent
            .as_ref()
            .and_then(|bt| bt.pointer("/info/name"))
            .and_then(Value::as_str);
        if let Some(name) = torrent_name {
            return name.to_string();
        }
        if let Some(path) = self.primary_path() {
            return path.rsplit('/').next().unwrap_or(path).to_string();
        }
        self.files
            .first()
            .and_then(|f| f.uris.first())
            .map(|u| u.uri.clone())
            .unwrap_or_else(|| self.gid.clone())
    }

    /// Size in bytes, 0 when unknown
    pub fn total_bytes(&self) -> u64 {
        parse_count(&self.total_length)
    }

    pub fn completed_bytes(&self) -> u64 {
        parse_count(&self.completed_length)
    }

    /// Bytes per second
    pub fn download_speed_bytes(&self) -> u64 {
        parse_count(&self.download_speed)
    }

    pub fn upload_speed_bytes(&self) -> u64 {
        parse_count(&self.upload_speed)
    }

    /// Fraction complete in `0.0..=1.0`; zero while the length is unknown.
    pub fn progress(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        (self.completed_bytes() as f64 / total as f64).min(1.0)
    }
}

fn parse_count(raw: &str) -> u64 {
    raw.trim().parse().unwrap_or(0)
}

/// Daemon-wide counters from `aria2.getGlobalStat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStat {
    #[serde(deserialize_with = "de_count")]
    pub download_speed: u64,
    #[serde(deserialize_with = "de_count")]
    pub upload_speed: u64,
    #[serde(deserialize_with = "de_count")]
    pub num_active: u64,
    #[serde(deserialize_with = "de_count")]
    pub num_waiting: u64,
    #[serde(deserialize_with = "de_count")]
    pub num_stopped: u64,
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid count: {text}"))),
    }
}

/// Change notifications published by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// A poll replaced the raw list and stats; carries the new revision.
    Replaced { revision: u64, downloads: usize },
    FilterChanged(String),
    SelectionChanged { selected: usize },
}

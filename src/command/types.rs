use crate::command::error::{CommandError, CommandResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// aria2 per-download options (`dir`, `out`, `split`, ...), passed through
/// as given.
pub type DownloadOptions = Map<String, Value>;

/// URIs to add, one download per item. An item may list mirrors of the same
/// file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UriBatch {
    pub items: Vec<Vec<String>>,
    pub options: DownloadOptions,
}

impl UriBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// One download per URI.
    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: uris.into_iter().map(|uri| vec![uri.into()]).collect(),
            options: DownloadOptions::new(),
        }
    }

    /// Add one download made of mirror `uris`
    pub fn push(&mut self, uris: Vec<String>) -> &mut Self {
        self.items.push(uris);
        self
    }

    /// Option applied to every item of the batch
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Contents of a `.torrent` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentSource {
    pub name: String,
    pub content: Vec<u8>,
}

impl TorrentSource {
    /// Torrent held in memory; `name` is only used in reports
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a torrent file from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> CommandResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, content })
    }

    /// Cheap structural check: a non-empty bencoded dictionary.
    pub fn validate(&self) -> CommandResult<()> {
        let content = &self.content;
        if content.len() <= 2 || content.first() != Some(&b'd') || content.last() != Some(&b'e') {
            return Err(CommandError::Validation(format!(
                "{} is not a bencoded torrent",
                self.name
            )));
        }
        Ok(())
    }

    /// Content in the encoding `aria2.addTorrent` expects
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TorrentBatch {
    pub torrents: Vec<TorrentSource>,
    pub options: DownloadOptions,
}

impl TorrentBatch {
    pub fn new(torrents: Vec<TorrentSource>) -> Self {
        Self {
            torrents,
            options: DownloadOptions::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.torrents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.torrents.is_empty()
    }
}

/// One item of a batch that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Position of the item in the caller's input
    pub index: usize,
    pub gid: Option<String>,
    pub message: String,
}

/// Result of a batch command. `gids` lists every item the command targeted
/// or created, in input order; `failures` the ones that were refused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub gids: Vec<String>,
    pub failures: Vec<ItemFailure>,
}

impl CommandReport {
    /// True when no item failed
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Gids whose item was accepted
    pub fn accepted(&self) -> Vec<String> {
        self.gids
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.failures.iter().any(|f| f.index == *index))
            .map(|(_, gid)| gid.clone())
            .collect()
    }
}

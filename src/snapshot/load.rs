use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use serde::de::Error as _;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::MetricsSnapshot;

/// Where the snapshot document lives: fetched over HTTP(S) or read from disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotSource {
    Url(Url),
    File(PathBuf),
}

impl SnapshotSource {
    pub fn parse(raw: &str) -> Self {
        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => SnapshotSource::Url(url),
            _ => SnapshotSource::File(PathBuf::from(raw)),
        }
    }
}

impl std::fmt::Display for SnapshotSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotSource::Url(url) => write!(f, "{url}"),
            SnapshotSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug)]
pub enum SnapshotError {
    /// Non-success HTTP response.
    Status(u16),
    Transport(reqwest::Error),
    Io(std::io::Error),
    /// The document is not a well-formed snapshot.
    Parse(serde_json::Error),
}

impl SnapshotError {
    pub fn is_parse(&self) -> bool {
        matches!(self, SnapshotError::Parse(_))
    }

    /// Short text safe to show a viewer; the full error goes to the logs only.
    pub fn user_message(&self) -> String {
        match self {
            SnapshotError::Status(code) => format!("Failed to load data ({code})"),
            SnapshotError::Transport(_) | SnapshotError::Io(_) => "Failed to load data".to_string(),
            SnapshotError::Parse(_) => "Data could not be read".to_string(),
        }
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Status(code) => write!(f, "snapshot request failed with status {code}"),
            SnapshotError::Transport(err) => write!(f, "transport error: {err}"),
            SnapshotError::Io(err) => write!(f, "io error: {err}"),
            SnapshotError::Parse(err) => write!(f, "malformed snapshot: {err}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Transport(err) => Some(err),
            SnapshotError::Io(err) => Some(err),
            SnapshotError::Parse(err) => Some(err),
            SnapshotError::Status(_) => None,
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client, SnapshotError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(SnapshotError::Transport)
}

/// One fetch of the raw document. Never retried.
pub async fn fetch_bytes(client: &Client, source: &SnapshotSource) -> Result<Bytes, SnapshotError> {
    match source {
        SnapshotSource::Url(url) => {
            let response = client
                .get(url.clone())
                .send()
                .await
                .map_err(SnapshotError::Transport)?;
            let status = response.status();
            if !status.is_success() {
                return Err(SnapshotError::Status(status.as_u16()));
            }
            response.bytes().await.map_err(SnapshotError::Transport)
        }
        SnapshotSource::File(path) => tokio::fs::read(path)
            .await
            .map(Bytes::from)
            .map_err(SnapshotError::Io),
    }
}

pub async fn load(client: &Client, source: &SnapshotSource) -> Result<MetricsSnapshot, SnapshotError> {
    let bytes = fetch_bytes(client, source).await?;
    debug!(source = %source, bytes = bytes.len(), "snapshot fetched");
    parse_snapshot(&bytes)
}

pub fn parse_snapshot(bytes: &[u8]) -> Result<MetricsSnapshot, SnapshotError> {
    let value: Value = serde_json::from_slice(bytes).map_err(SnapshotError::Parse)?;
    if !value.is_object() {
        return Err(SnapshotError::Parse(serde_json::Error::custom(
            "snapshot root must be an object",
        )));
    }
    serde_json::from_value(value).map_err(SnapshotError::Parse)
}

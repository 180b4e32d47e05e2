//! Host collaborators: the download manager, the blob registry, local storage
//! and the context-menu subsystem. The core only talks to them through these
//! traits.

pub mod memory;
pub mod native;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("{0}")]
    Rejected(String),

    #[error("Unsupported source: {0}")]
    Unsupported(String),

    #[error("Unknown blob URL: {0}")]
    UnknownBlob(String),

    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("I/O failure: {0}")]
    Io(String),
}

pub type Result<T> = std::result::Result<T, HostError>;

/// Identifier handed back by the host for an accepted download.
pub type DownloadId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Target path relative to the download root
    pub filename: String,
    /// Prompt the user for a location instead of saving silently
    pub save_as: bool,
}

#[async_trait]
pub trait HostDownloader: Send + Sync {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId>;
}

/// Transient in-memory objects exposed through fetchable `blob:` URLs.
pub trait BlobRegistry: Send + Sync {
    fn create_object_url(&self, data: Bytes, mime_type: &str) -> Result<String>;
    fn revoke_object_url(&self, url: &str);
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: String,
    pub title: String,
    pub contexts: Vec<String>,
    pub document_url_patterns: Vec<String>,
}

#[async_trait]
pub trait ContextMenus: Send + Sync {
    async fn remove_all(&self) -> Result<()>;
    async fn create(&self, item: MenuItem) -> Result<()>;
}

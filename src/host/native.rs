//! Desktop implementations of the host collaborators.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::memory::MemoryBlobRegistry;
use super::{DownloadId, DownloadRequest, HostDownloader, HostError, KeyValueStore, Result};
use crate::api::FetchClient;
use crate::utils::is_data_url;

/// Writes downloads below a root directory. Remote URLs are streamed over
/// HTTP, `blob:` URLs are served from the shared blob registry. Inline `data:`
/// URLs are refused so callers go through the blob path.
pub struct NativeDownloader {
    client: FetchClient,
    blobs: Arc<MemoryBlobRegistry>,
    root: RwLock<PathBuf>,
    next_id: AtomicU64,
}

impl NativeDownloader {
    pub fn new(client: FetchClient, blobs: Arc<MemoryBlobRegistry>, root: PathBuf) -> Self {
        Self {
            client,
            blobs,
            root: RwLock::new(root),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn download_dir(&self) -> PathBuf {
        self.root
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_download_dir(&self, dir: PathBuf) {
        tracing::info!("Download directory set to {}", dir.display());
        *self
            .root
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = dir;
    }

    async fn choose_save_path(&self, suggested: &Path) -> Option<PathBuf> {
        let mut dialog = rfd::AsyncFileDialog::new();
        if let Some(name) = suggested.file_name().and_then(|n| n.to_str()) {
            dialog = dialog.set_file_name(name);
        }
        if let Some(dir) = suggested.parent() {
            dialog = dialog.set_directory(dir);
        }
        dialog
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }
}

/// Resolve a relative target below `root`, refusing anything that escapes it.
fn resolve_target(root: &Path, filename: &str) -> Result<PathBuf> {
    let relative = Path::new(filename);
    let escapes = relative.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if filename.is_empty() || escapes {
        return Err(HostError::Rejected(format!("Invalid filename: {}", filename)));
    }
    Ok(root.join(relative))
}

#[async_trait]
impl HostDownloader for NativeDownloader {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadId> {
        if is_data_url(&request.url) {
            return Err(HostError::Unsupported(
                "inline data URLs must be submitted as blobs".to_string(),
            ));
        }

        let mut target = resolve_target(&self.download_dir(), &request.filename)?;
        if request.save_as {
            target = self
                .choose_save_path(&target)
                .await
                .ok_or_else(|| HostError::Rejected("Download cancelled".to_string()))?;
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HostError::Io(e.to_string()))?;
        }

        if request.url.starts_with("blob:") {
            let blob = self.blobs.resolve(&request.url)?;
            tokio::fs::write(&target, &blob.data)
                .await
                .map_err(|e| HostError::Io(e.to_string()))?;
        } else {
            self.client
                .fetch_to_file(&request.url, &target)
                .await
                .map_err(|e| HostError::Rejected(e.to_string()))?;
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("Download {} saved to {}", id, target.display());
        Ok(id)
    }
}

/// Key-value store persisted as one JSON object in a file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    async fn load(&self) -> Result<Map<String, Value>> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice::<Value>(&raw) {
                Ok(Value::Object(map)) => Ok(map),
                Ok(_) | Err(_) => {
                    tracing::warn!("Ignoring unreadable store at {}", self.path.display());
                    Ok(Map::new())
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(HostError::Storage(e.to_string())),
        }
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HostError::Storage(e.to_string()))?;
        }
        let raw = serde_json::to_vec_pretty(&Value::Object(map))
            .map_err(|e| HostError::Storage(e.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| HostError::Storage(e.to_string()))
    }
}

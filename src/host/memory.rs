//! In-process implementations of the host collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::{BlobRegistry, ContextMenus, HostError, KeyValueStore, MenuItem, Result};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(lock(&self.values).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Blob {
    pub data: Bytes,
    pub mime_type: String,
}

/// Keeps blob contents alive until their URL is revoked.
#[derive(Default)]
pub struct MemoryBlobRegistry {
    blobs: Mutex<HashMap<String, Blob>>,
    next_id: AtomicU64,
}

impl MemoryBlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, url: &str) -> Result<Blob> {
        lock(&self.blobs)
            .get(url)
            .cloned()
            .ok_or_else(|| HostError::UnknownBlob(url.to_string()))
    }

    pub fn live_count(&self) -> usize {
        lock(&self.blobs).len()
    }
}

impl BlobRegistry for MemoryBlobRegistry {
    fn create_object_url(&self, data: Bytes, mime_type: &str) -> Result<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = format!("blob:image-downloader/{}", id);
        lock(&self.blobs).insert(
            url.clone(),
            Blob {
                data,
                mime_type: mime_type.to_string(),
            },
        );
        Ok(url)
    }

    fn revoke_object_url(&self, url: &str) {
        lock(&self.blobs).remove(url);
    }
}

/// Context-menu items currently registered with the host.
#[derive(Default)]
pub struct MenuRegistry {
    items: Mutex<Vec<MenuItem>>,
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<MenuItem> {
        lock(&self.items).clone()
    }

    pub fn find(&self, id: &str) -> Option<MenuItem> {
        lock(&self.items).iter().find(|item| item.id == id).cloned()
    }
}

#[async_trait]
impl ContextMenus for MenuRegistry {
    async fn remove_all(&self) -> Result<()> {
        lock(&self.items).clear();
        Ok(())
    }

    async fn create(&self, item: MenuItem) -> Result<()> {
        let mut items = lock(&self.items);
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(HostError::Rejected(format!(
                "Cannot create item with duplicate id {}",
                item.id
            )));
        }
        items.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn store_round_trips_values() {
        let store = MemoryStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", json!([1, 2])).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!([1, 2])));
    }

    #[test]
    fn revoked_blobs_are_gone() {
        let blobs = MemoryBlobRegistry::new();
        let url = blobs
            .create_object_url(Bytes::from_static(b"png"), "image/png")
            .unwrap();
        assert!(url.starts_with("blob:"));
        assert_eq!(blobs.resolve(&url).unwrap().mime_type, "image/png");

        blobs.revoke_object_url(&url);
        assert_eq!(blobs.live_count(), 0);
        assert!(matches!(blobs.resolve(&url), Err(HostError::UnknownBlob(_))));
    }

    #[tokio::test]
    async fn menu_ids_must_be_unique() {
        let menus = MenuRegistry::new();
        let item = MenuItem {
            id: "a".into(),
            title: "A".into(),
            contexts: vec!["image".into()],
            document_url_patterns: vec![],
        };
        menus.create(item.clone()).await.unwrap();
        assert!(menus.create(item.clone()).await.is_err());

        menus.remove_all().await.unwrap();
        menus.create(item).await.unwrap();
        assert_eq!(menus.items().len(), 1);
    }
}

use std::sync::Arc;

use serde_json::Value;

use crate::domain::{AppError, DownloadRecord};
use crate::host::KeyValueStore;

pub const HISTORY_KEY: &str = "recentDownloads";
pub const HISTORY_CAP: usize = 10;

/// Insert `record` at the front and drop everything beyond `cap`.
pub fn push_capped(records: &mut Vec<DownloadRecord>, record: DownloadRecord, cap: usize) {
    records.insert(0, record);
    records.truncate(cap);
}

/// Most-recent-first download history kept in the host's key-value storage.
///
/// Each update is a separate read-modify-write, so two triggers racing each
/// other can lose an entry.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Vec<DownloadRecord>, AppError> {
        let value = self
            .store
            .get(HISTORY_KEY)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        Ok(match value {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!("Discarding malformed download history: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        })
    }

    pub async fn recent(&self, limit: usize) -> Result<Vec<DownloadRecord>, AppError> {
        let mut records = self.load().await?;
        records.truncate(limit);
        Ok(records)
    }

    pub async fn record(&self, record: DownloadRecord) -> Result<(), AppError> {
        let mut records = self.load().await?;
        push_capped(&mut records, record, HISTORY_CAP);

        let value: Value =
            serde_json::to_value(&records).map_err(|e| AppError::Storage(e.to_string()))?;
        self.store
            .set(HISTORY_KEY, value)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::MemoryStore;
    use serde_json::json;

    fn record(n: u64) -> DownloadRecord {
        DownloadRecord {
            url: format!("https://x.com/{}.png", n),
            filename: format!("{}_1_{}.png", n, n),
            timestamp: n,
        }
    }

    #[test]
    fn push_keeps_newest_first() {
        let mut records = Vec::new();
        for n in 0..15 {
            push_capped(&mut records, record(n), HISTORY_CAP);
            assert!(records.len() <= HISTORY_CAP);
            assert_eq!(records[0].timestamp, n);
        }
        let order: Vec<u64> = records.iter().map(|r| r.timestamp).collect();
        assert_eq!(order, (5..15).rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn record_is_capped_in_storage() {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(store.clone());
        for n in 0..12 {
            history.record(record(n)).await.unwrap();
        }

        let saved = store.get(HISTORY_KEY).await.unwrap().unwrap();
        assert_eq!(saved.as_array().unwrap().len(), HISTORY_CAP);
        assert_eq!(saved[0]["timestamp"], 11);

        let recent = history.recent(3).await.unwrap();
        let order: Vec<u64> = recent.iter().map(|r| r.timestamp).collect();
        assert_eq!(order, vec![11, 10, 9]);
    }

    #[tokio::test]
    async fn malformed_history_starts_over() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, json!("garbage")).await.unwrap();
        let history = HistoryStore::new(store);

        assert!(history.load().await.unwrap().is_empty());
        history.record(record(1)).await.unwrap();
        assert_eq!(history.load().await.unwrap(), vec![record(1)]);
    }
}

//! MetadataStore - Local Image Metadata Persistence
//!
//! ## Responsibilities
//!
//! - Typed mapping from logical filename to image metadata
//! - Single-file JSON persistence, rewritten after every mutation
//! - Best-effort load at startup (never blocks boot on a bad file)
//!
//! The remote media host does not preserve original capture
//! timestamps, so this store is the source of truth for ordering.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

/// Metadata for one captured image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Capture time (unix seconds), the sort key for all listings
    pub timestamp: i64,
    /// Asset id on the remote media host
    #[serde(rename = "cloudinary_id")]
    pub remote_id: String,
    /// Delivery URL on the remote media host
    pub url: String,
}

/// MetadataStore instance
pub struct MetadataStore {
    /// Path of the JSON metadata file
    path: PathBuf,
    /// filename -> record; BTreeMap keeps the file diff-stable
    records: Arc<RwLock<BTreeMap<String, ImageRecord>>>,
}

impl MetadataStore {
    /// Create a store backed by `path`, loading whatever is already there.
    ///
    /// A missing, unreadable, or unparseable file yields an empty store;
    /// persistence here is best-effort by design.
    pub async fn open(path: PathBuf) -> Self {
        let records = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<BTreeMap<String, ImageRecord>>(&bytes) {
                Ok(map) => {
                    tracing::info!(
                        path = %path.display(),
                        count = map.len(),
                        "Loaded image metadata"
                    );
                    map
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Metadata file unparseable, starting empty"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Metadata file unreadable, starting empty"
                );
                BTreeMap::new()
            }
        };

        Self {
            path,
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Rewrite the metadata file from the in-memory map.
    ///
    /// Writes to a sibling `.tmp` file and renames into place so a crash
    /// mid-write cannot truncate the previous file. Failures are logged;
    /// the in-memory state stays authoritative for this process.
    pub async fn save(&self) {
        let snapshot = self.records.read().await.clone();

        let result: Result<()> = async {
            let bytes = serde_json::to_vec(&snapshot)
                .map_err(|e| Error::Persistence(format!("metadata serialize: {}", e)))?;
            let tmp = self.path.with_extension("json.tmp");
            fs::write(&tmp, &bytes)
                .await
                .map_err(|e| Error::Persistence(format!("metadata write: {}", e)))?;
            fs::rename(&tmp, &self.path)
                .await
                .map_err(|e| Error::Persistence(format!("metadata rename: {}", e)))?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to persist image metadata, keeping in-memory state"
            );
        }
    }

    /// Insert or replace a record. Does not persist; call `save` after
    /// the mutation batch.
    pub async fn insert(&self, filename: String, record: ImageRecord) {
        self.records.write().await.insert(filename, record);
    }

    /// Remove a record, returning it if present.
    pub async fn remove(&self, filename: &str) -> Option<ImageRecord> {
        self.records.write().await.remove(filename)
    }

    /// Look up one record.
    pub async fn get(&self, filename: &str) -> Option<ImageRecord> {
        self.records.read().await.get(filename).cloned()
    }

    /// Whether any record already references this remote asset id.
    pub async fn contains_remote_id(&self, remote_id: &str) -> bool {
        self.records
            .read()
            .await
            .values()
            .any(|r| r.remote_id == remote_id)
    }

    /// Whether a filename key is taken.
    pub async fn contains_filename(&self, filename: &str) -> bool {
        self.records.read().await.contains_key(filename)
    }

    /// Cloned view of all records.
    pub async fn snapshot(&self) -> Vec<(String, ImageRecord)> {
        self.records
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Number of records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: i64, id: &str) -> ImageRecord {
        ImageRecord {
            timestamp: ts,
            remote_id: id.to_string(),
            url: format!("https://media.example/{}.png", id),
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("missing.json")).await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_open_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = MetadataStore::open(path).await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");

        let store = MetadataStore::open(path.clone()).await;
        store
            .insert("whiteboard_100.png".to_string(), record(100, "wb/a"))
            .await;
        store
            .insert("whiteboard_200.jpg".to_string(), record(200, "wb/b"))
            .await;
        store.save().await;

        let reloaded = MetadataStore::open(path).await;
        assert_eq!(reloaded.len().await, 2);
        assert_eq!(
            reloaded.get("whiteboard_100.png").await,
            Some(record(100, "wb/a"))
        );
    }

    #[tokio::test]
    async fn test_remove_and_remote_id_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(dir.path().join("meta.json")).await;
        store
            .insert("whiteboard_100.png".to_string(), record(100, "wb/a"))
            .await;

        assert!(store.contains_remote_id("wb/a").await);
        assert!(!store.contains_remote_id("wb/zzz").await);

        let removed = store.remove("whiteboard_100.png").await;
        assert_eq!(removed, Some(record(100, "wb/a")));
        assert!(!store.contains_remote_id("wb/a").await);
        assert_eq!(store.remove("whiteboard_100.png").await, None);
    }

    #[tokio::test]
    async fn test_file_format_matches_legacy_layout() {
        // The on-disk shape is {filename: {timestamp, cloudinary_id, url}}.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.json");
        std::fs::write(
            &path,
            br#"{"whiteboard_42.png":{"timestamp":42,"cloudinary_id":"wb/42","url":"https://x/42"}}"#,
        )
        .unwrap();

        let store = MetadataStore::open(path).await;
        let rec = store.get("whiteboard_42.png").await.unwrap();
        assert_eq!(rec.timestamp, 42);
        assert_eq!(rec.remote_id, "wb/42");
    }
}

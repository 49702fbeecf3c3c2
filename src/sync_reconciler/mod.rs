//! SyncReconciler - Remote Listing to Local Metadata Merge
//!
//! ## Responsibilities
//!
//! - Walk the primary folder, then each legacy folder, in that order
//! - Invent an `ImageRecord` for any remote asset not yet known locally
//! - Stay idempotent: unchanged remote state inserts nothing
//!
//! The remote asset id is the dedup key; the folder order means an id
//! seen in an earlier folder wins over a later duplicate. A listing
//! failure for one folder degrades to a no-op for that folder only.

use crate::media_gateway::{MediaGateway, RemoteAsset};
use crate::metadata_store::{ImageRecord, MetadataStore};
use crate::session_registry::now_unix;
use chrono::NaiveDateTime;
use std::sync::Arc;

/// Timestamp format used by the remote host's `created_at` field
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Reconciler instance
pub struct Reconciler {
    gateway: Arc<MediaGateway>,
    store: Arc<MetadataStore>,
    primary_folder: String,
    legacy_folders: Vec<String>,
}

impl Reconciler {
    pub fn new(
        gateway: Arc<MediaGateway>,
        store: Arc<MetadataStore>,
        primary_folder: String,
        legacy_folders: Vec<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            primary_folder,
            legacy_folders,
        }
    }

    /// Merge every configured folder into the store and persist once.
    ///
    /// Returns the number of newly invented records.
    pub async fn sync_all(&self) -> usize {
        let mut inserted = 0;

        let mut folders = Vec::with_capacity(1 + self.legacy_folders.len());
        folders.push(self.primary_folder.clone());
        folders.extend(self.legacy_folders.iter().cloned());

        for folder in &folders {
            match self.gateway.list_folder(folder).await {
                Ok(assets) => {
                    inserted += merge_assets(&self.store, &assets, now_unix()).await;
                }
                Err(e) => {
                    tracing::warn!(
                        folder = %folder,
                        error = %e,
                        "Remote listing failed, skipping folder this pass"
                    );
                }
            }
        }

        if inserted > 0 {
            tracing::info!(inserted = inserted, "Reconciliation added records");
        }
        self.store.save().await;

        inserted
    }
}

/// Merge one folder's listing into the store. Returns inserted count.
pub async fn merge_assets(store: &MetadataStore, assets: &[RemoteAsset], now: i64) -> usize {
    let mut inserted = 0;

    for asset in assets {
        if store.contains_remote_id(&asset.public_id).await {
            continue;
        }

        let timestamp = derive_timestamp(asset, now);
        let filename = format!("whiteboard_{}.{}", timestamp, asset.format_or_default());

        // Filename is the join key; handing it to a second remote id
        // would orphan one of the two on every subsequent pass.
        if store.contains_filename(&filename).await {
            tracing::warn!(
                filename = %filename,
                public_id = %asset.public_id,
                "Synthesized filename already taken, skipping remote asset"
            );
            continue;
        }

        store
            .insert(
                filename,
                ImageRecord {
                    timestamp,
                    remote_id: asset.public_id.clone(),
                    url: asset.secure_url.clone(),
                },
            )
            .await;
        inserted += 1;
    }

    inserted
}

/// Capture timestamp for a remote asset: digits embedded in a
/// `whiteboard_<digits>` basename, else the host's `created_at`,
/// else the current wall clock.
fn derive_timestamp(asset: &RemoteAsset, now: i64) -> i64 {
    if let Some(ts) = timestamp_from_name(asset.basename()) {
        return ts;
    }

    if let Some(created_at) = asset.created_at.as_deref() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(created_at, CREATED_AT_FORMAT) {
            return dt.and_utc().timestamp();
        }
    }

    now
}

/// Parse the `<digits>` out of a `whiteboard_<digits>` basename.
fn timestamp_from_name(basename: &str) -> Option<i64> {
    let (_, rest) = basename.split_once("whiteboard_")?;
    let digits = rest.split('.').next().unwrap_or(rest);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(public_id: &str, created_at: Option<&str>) -> RemoteAsset {
        RemoteAsset {
            public_id: public_id.to_string(),
            format: Some("png".to_string()),
            created_at: created_at.map(|s| s.to_string()),
            secure_url: format!("https://media.example/{}", public_id),
        }
    }

    async fn empty_store(dir: &tempfile::TempDir) -> MetadataStore {
        MetadataStore::open(dir.path().join("meta.json")).await
    }

    #[test]
    fn test_timestamp_from_name() {
        assert_eq!(timestamp_from_name("whiteboard_1700000000"), Some(1700000000));
        assert_eq!(timestamp_from_name("whiteboard_42.png"), Some(42));
        assert_eq!(timestamp_from_name("whiteboard_abc"), None);
        assert_eq!(timestamp_from_name("whiteboard_"), None);
        assert_eq!(timestamp_from_name("folder_placeholder"), None);
    }

    #[test]
    fn test_derive_timestamp_prefers_name_digits() {
        let a = asset(
            "whiteboard_captures/whiteboard_123",
            Some("2024-01-01T00:00:00Z"),
        );
        assert_eq!(derive_timestamp(&a, 999), 123);
    }

    #[test]
    fn test_derive_timestamp_parses_created_at() {
        let a = asset("whiteboard_captures/scan_7", Some("2024-01-01T00:00:00Z"));
        assert_eq!(derive_timestamp(&a, 999), 1704067200);
    }

    #[test]
    fn test_derive_timestamp_falls_back_to_now() {
        let a = asset("whiteboard_captures/scan_7", Some("not a datetime"));
        assert_eq!(derive_timestamp(&a, 999), 999);
        let b = asset("whiteboard_captures/scan_7", None);
        assert_eq!(derive_timestamp(&b, 999), 999);
    }

    #[tokio::test]
    async fn test_merge_invents_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir).await;

        let assets = vec![asset("whiteboard_captures/whiteboard_100", None)];
        let inserted = merge_assets(&store, &assets, 500).await;
        assert_eq!(inserted, 1);

        let rec = store.get("whiteboard_100.png").await.unwrap();
        assert_eq!(rec.timestamp, 100);
        assert_eq!(rec.remote_id, "whiteboard_captures/whiteboard_100");
    }

    #[tokio::test]
    async fn test_merge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir).await;

        let assets = vec![
            asset("whiteboard_captures/whiteboard_100", None),
            asset("whiteboard_captures/scan_7", Some("2024-01-01T00:00:00Z")),
        ];

        assert_eq!(merge_assets(&store, &assets, 500).await, 2);
        assert_eq!(merge_assets(&store, &assets, 500).await, 0);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_duplicate_remote_id_across_folders_yields_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir).await;

        // Same asset id listed from the primary and a legacy folder.
        let primary = vec![asset("whiteboard_captures/whiteboard_100", None)];
        let legacy = vec![asset("whiteboard_captures/whiteboard_100", None)];

        merge_assets(&store, &primary, 500).await;
        let inserted = merge_assets(&store, &legacy, 500).await;
        assert_eq!(inserted, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_filename_collision_keeps_earlier_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = empty_store(&dir).await;

        // Two distinct assets deriving the same timestamp and format.
        let assets = vec![
            asset("whiteboard_captures/whiteboard_100", None),
            asset("whiteboard_images/whiteboard_100", None),
        ];

        assert_eq!(merge_assets(&store, &assets, 500).await, 1);
        let rec = store.get("whiteboard_100.png").await.unwrap();
        assert_eq!(rec.remote_id, "whiteboard_captures/whiteboard_100");

        // Still stable on the next pass: the first asset dedups by
        // remote id, the second keeps hitting the taken filename.
        assert_eq!(merge_assets(&store, &assets, 500).await, 0);
        assert_eq!(store.len().await, 1);
    }
}

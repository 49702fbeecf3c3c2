//! Application state
//!
//! Holds all shared components and state

use crate::media_gateway::{GatewayConfig, MediaGateway};
use crate::metadata_store::MetadataStore;
use crate::session_registry::SessionRegistry;
use crate::sync_reconciler::Reconciler;
use std::path::PathBuf;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JSON metadata file path
    pub metadata_file: PathBuf,
    /// Local image directory (legacy fallback for transitioned installs)
    pub local_image_dir: PathBuf,
    /// Static assets directory (main page)
    pub static_dir: PathBuf,
    /// Primary remote folder for new uploads
    pub primary_folder: String,
    /// Legacy remote folders still scanned during reconciliation
    pub legacy_folders: Vec<String>,
    /// Remote media host credentials
    pub gateway: GatewayConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            metadata_file: std::env::var("METADATA_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("image_metadata.json")),
            local_image_dir: std::env::var("LOCAL_IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("images")),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
            primary_folder: std::env::var("CLOUDINARY_FOLDER")
                .unwrap_or_else(|_| "whiteboard_captures".to_string()),
            legacy_folders: std::env::var("CLOUDINARY_LEGACY_FOLDERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|_| vec!["whiteboard_images".to_string()]),
            gateway: GatewayConfig::from_env(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// MetadataStore (filename -> record, JSON-file backed)
    pub metadata: Arc<MetadataStore>,
    /// SessionRegistry (per-session visibility state)
    pub sessions: Arc<SessionRegistry>,
    /// MediaGateway (remote host adapter)
    pub gateway: Arc<MediaGateway>,
    /// Reconciler (remote listing -> local metadata)
    pub reconciler: Arc<Reconciler>,
}

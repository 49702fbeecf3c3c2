//! Shared models and types for the whiteboard capture server
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use serde::{Deserialize, Serialize};

/// Response to a successful upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub cloudinary_id: String,
    pub url: String,
    pub folder: String,
}

/// One image in the session-visible listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    pub filename: String,
    pub timestamp: i64,
    pub cloudinary_url: String,
}

/// Response to a forced reconciliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub message: String,
    pub image_count: usize,
}

/// Response to folder setup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupFolderResponse {
    pub message: String,
    pub folder_exists: bool,
}

/// Response to a session reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetSessionResponse {
    pub message: String,
    pub new_start_time: i64,
}

/// Service status counts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub cloudinary_folder: String,
    pub alternative_folders: Vec<String>,
    pub total_image_count: usize,
    pub session_image_count: usize,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

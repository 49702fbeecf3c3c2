//! Whiteboard Capture Server Library
//!
//! Backend for a collaborative whiteboard capture tool: snapshot
//! images live on a hosted image API, and anonymous per-browser
//! sessions see only what was captured since they started.
//!
//! ## Architecture (6 Components)
//!
//! 1. MetadataStore - filename -> {timestamp, remote id, URL}, JSON-file backed
//! 2. MediaGateway - remote image host adapter (upload/delete/list/fetch)
//! 3. SessionRegistry - per-session deletion sets and visibility windows
//! 4. SyncReconciler - remote listing merged into local metadata
//! 5. ExportBuilder - zip and one-image-per-page PDF assembly
//! 6. WebAPI - REST API endpoints and session cookie issuance
//!
//! ## Design Principles
//!
//! - MetadataStore is the single source of truth for capture timestamps
//! - Sessions never share mutable state; each owns its visibility window
//! - Remote faults degrade to no-ops wherever the operation allows it

pub mod error;
pub mod export_builder;
pub mod media_gateway;
pub mod metadata_store;
pub mod models;
pub mod session_registry;
pub mod state;
pub mod sync_reconciler;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;

//! API Routes

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde_json::json;
use tokio::fs;
use tower_http::services::{ServeDir, ServeFile};

use crate::error::{Error, Result};
use crate::export_builder::{build_pdf, build_zip};
use crate::metadata_store::ImageRecord;
use crate::models::{
    ImageEntry, ResetSessionResponse, SetupFolderResponse, StatusResponse, SyncResponse,
    UploadResponse,
};
use crate::session_registry::now_unix;
use crate::state::AppState;
use crate::web_api::session::{self, SessionId};

/// PDF page size in points (12x8 inches at 72 DPI)
const WHITEBOARD_SIZE: (f32, f32) = (864.0, 576.0);

/// Upload size cap
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    let index = ServeFile::new(state.config.static_dir.join("index.html"));
    let assets = ServeDir::new(state.config.static_dir.clone());

    Router::new()
        // Main page & assets
        .route_service("/", index)
        .nest_service("/static", assets)
        // Health
        .route("/healthz", get(super::health_check))
        // Images
        .route("/api/upload", post(upload_image))
        .route("/api/delete/:filename", delete(delete_image))
        .route("/api/images", get(list_images))
        .route("/api/images/:filename", get(get_image))
        // Exports
        .route("/api/download", get(download_zip))
        .route("/api/download-pdf", get(download_pdf))
        // Remote host maintenance
        .route("/api/sync-cloudinary", get(sync_remote))
        .route("/api/setup-folder", get(setup_folder))
        // Session
        .route("/api/reset-session", get(reset_session))
        // Status
        .route("/api/status", get(status))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::ensure_session,
        ))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Pull the session id issued by the middleware; its absence means the
/// request bypassed session setup and counts as unauthenticated.
fn require_session(session: Option<Extension<SessionId>>) -> Result<String> {
    session
        .map(|Extension(SessionId(id))| id)
        .ok_or_else(|| Error::NoSession("No session established".to_string()))
}

/// Visible records for a session, ascending by capture timestamp.
async fn visible_images(state: &AppState, session_id: &str) -> Result<Vec<(String, ImageRecord)>> {
    let mut visible = Vec::new();
    for (filename, record) in state.metadata.snapshot().await {
        if state
            .sessions
            .is_visible(session_id, &filename, &record)
            .await?
        {
            visible.push((filename, record));
        }
    }
    visible.sort_by_key(|(_, r)| r.timestamp);
    Ok(visible)
}

// ========================================
// Image Handlers
// ========================================

async fn upload_image(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    require_session(session)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() == Some("image") {
            let original_name = field.file_name().unwrap_or_default().to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| Error::Validation(format!("Unreadable image field: {}", e)))?;
            upload = Some((original_name, data.to_vec()));
            break;
        }
    }

    let (original_name, data) =
        upload.ok_or_else(|| Error::Validation("No image provided".to_string()))?;
    if original_name.is_empty() || data.is_empty() {
        return Err(Error::Validation("No selected file".to_string()));
    }

    let timestamp = now_unix();
    let extension = original_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "png".to_string());
    let base_filename = format!("whiteboard_{}", timestamp);
    let filename = format!("{}.{}", base_filename, extension);

    let folder = state.config.primary_folder.clone();
    let result = state.gateway.upload(data, &base_filename, &folder).await?;

    state
        .metadata
        .insert(
            filename.clone(),
            ImageRecord {
                timestamp,
                remote_id: result.public_id.clone(),
                url: result.secure_url.clone(),
            },
        )
        .await;
    state.metadata.save().await;

    tracing::info!(filename = %filename, remote_id = %result.public_id, "Image uploaded");

    Ok(Json(UploadResponse {
        message: "Upload successful".to_string(),
        filename,
        cloudinary_id: result.public_id,
        url: result.secure_url,
        folder,
    }))
}

async fn delete_image(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
    Path(filename): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let session_id = require_session(session)?;

    if let Some(record) = state.metadata.get(&filename).await {
        // Remote destroy is best-effort; the session-level deletion
        // below must land either way.
        if let Err(e) = state.gateway.destroy(&record.remote_id).await {
            tracing::warn!(
                filename = %filename,
                remote_id = %record.remote_id,
                error = %e,
                "Remote delete failed"
            );
        }
        state.metadata.remove(&filename).await;
        state.metadata.save().await;
    }

    state.sessions.record_deletion(&session_id, &filename).await?;
    tracing::info!(filename = %filename, session_id = %session_id, "Image deleted");

    Ok(Json(json!({ "message": "Deleted" })))
}

async fn list_images(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
) -> Result<Json<Vec<ImageEntry>>> {
    let session_id = require_session(session)?;

    state.reconciler.sync_all().await;

    let entries = visible_images(&state, &session_id)
        .await?
        .into_iter()
        .map(|(filename, record)| ImageEntry {
            filename,
            timestamp: record.timestamp,
            cloudinary_url: record.url,
        })
        .collect();

    Ok(Json(entries))
}

async fn get_image(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let session_id = require_session(session)?;

    if state.sessions.is_deleted(&session_id, &filename).await? {
        return Err(Error::NotFound("Not available".to_string()));
    }

    if let Some(record) = state.metadata.get(&filename).await {
        return Ok(found_redirect(&record.url));
    }

    // A freshly uploaded image may not be known yet; one sync pass
    // before giving up.
    state.reconciler.sync_all().await;
    if let Some(record) = state.metadata.get(&filename).await {
        return Ok(found_redirect(&record.url));
    }

    serve_local_image(&state, &filename).await
}

/// Plain 302 to the remote delivery URL.
fn found_redirect(url: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, url.to_string())]).into_response()
}

/// Legacy fallback: serve the file from the local image directory.
async fn serve_local_image(state: &AppState, filename: &str) -> Result<Response> {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(Error::NotFound(filename.to_string()));
    }

    let path = state.config.local_image_dir.join(filename);
    let bytes = fs::read(&path)
        .await
        .map_err(|_| Error::NotFound(filename.to_string()))?;

    let content_type = match filename.rsplit_once('.').map(|(_, e)| e) {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

// ========================================
// Export Handlers
// ========================================

/// Fetch bytes for every visible image, skipping any that the remote
/// host refuses to serve.
async fn fetch_visible(state: &AppState, session_id: &str) -> Result<Vec<(String, Vec<u8>)>> {
    let mut images = Vec::new();
    for (filename, record) in visible_images(state, session_id).await? {
        match state.gateway.fetch(&record.url).await {
            Ok(Some(bytes)) => images.push((filename, bytes)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(filename = %filename, error = %e, "Image fetch failed, skipping");
            }
        }
    }
    Ok(images)
}

async fn download_zip(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
) -> Result<Response> {
    let session_id = require_session(session)?;

    state.reconciler.sync_all().await;
    let images = fetch_visible(&state, &session_id).await?;
    let archive = build_zip(&images)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"images.zip\"",
            ),
        ],
        archive,
    )
        .into_response())
}

async fn download_pdf(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
) -> Result<Response> {
    let session_id = require_session(session)?;

    state.reconciler.sync_all().await;
    let images = fetch_visible(&state, &session_id).await?;
    let document = build_pdf(&images, WHITEBOARD_SIZE)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"images.pdf\"",
            ),
        ],
        document,
    )
        .into_response())
}

// ========================================
// Maintenance & Session Handlers
// ========================================

async fn sync_remote(State(state): State<AppState>) -> Result<Json<SyncResponse>> {
    state.reconciler.sync_all().await;

    Ok(Json(SyncResponse {
        message: "Successfully synchronized with Cloudinary".to_string(),
        image_count: state.metadata.len().await,
    }))
}

async fn setup_folder(State(state): State<AppState>) -> Result<Json<SetupFolderResponse>> {
    let folder = state.config.primary_folder.clone();
    let folder_exists = state.gateway.ensure_folder(&folder).await?;

    Ok(Json(SetupFolderResponse {
        message: format!("Folder '{}' created or confirmed", folder),
        folder_exists,
    }))
}

async fn reset_session(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
) -> Result<Json<ResetSessionResponse>> {
    let session_id = require_session(session)?;
    let new_start_time = state.sessions.reset(&session_id).await?;

    tracing::info!(session_id = %session_id, new_start_time, "Session reset");

    Ok(Json(ResetSessionResponse {
        message: "Session reset successful".to_string(),
        new_start_time,
    }))
}

async fn status(
    State(state): State<AppState>,
    session: Option<Extension<SessionId>>,
) -> Result<Json<StatusResponse>> {
    state.reconciler.sync_all().await;

    let session_image_count = match session {
        Some(Extension(SessionId(id))) => visible_images(&state, &id).await?.len(),
        None => 0,
    };

    Ok(Json(StatusResponse {
        status: "online".to_string(),
        cloudinary_folder: state.config.primary_folder.clone(),
        alternative_folders: state.config.legacy_folders.clone(),
        total_image_count: state.metadata.len().await,
        session_image_count,
    }))
}

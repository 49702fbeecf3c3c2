//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Session cookie issuance (opaque token, first contact)
//! - Request validation
//! - Response formatting

mod routes;
mod session;

pub use routes::create_router;
pub use session::{SessionId, SESSION_COOKIE};

use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

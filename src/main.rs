//! Whiteboard Capture Server
//!
//! Main entry point for the capture backend.

use std::sync::Arc;

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whiteboard_server::{
    media_gateway::MediaGateway,
    metadata_store::MetadataStore,
    session_registry::SessionRegistry,
    state::{AppConfig, AppState},
    sync_reconciler::Reconciler,
    web_api,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "whiteboard_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting whiteboard capture server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        metadata_file = %config.metadata_file.display(),
        primary_folder = %config.primary_folder,
        legacy_folders = ?config.legacy_folders,
        "Configuration loaded"
    );

    // Initialize components
    let metadata = Arc::new(MetadataStore::open(config.metadata_file.clone()).await);
    tracing::info!(count = metadata.len().await, "MetadataStore initialized");

    let sessions = Arc::new(SessionRegistry::new());
    tracing::info!("SessionRegistry initialized");

    let gateway = Arc::new(MediaGateway::new(config.gateway.clone())?);
    tracing::info!("MediaGateway initialized");

    let reconciler = Arc::new(Reconciler::new(
        gateway.clone(),
        metadata.clone(),
        config.primary_folder.clone(),
        config.legacy_folders.clone(),
    ));
    tracing::info!("Reconciler initialized");

    let state = AppState {
        config: config.clone(),
        metadata,
        sessions,
        gateway,
        reconciler,
    };

    // Build router
    let app = web_api::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, app).await?;

    Ok(())
}

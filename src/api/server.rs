use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::process_image::process_image_handler;
use crate::config::ServiceConfig;
use crate::executor::OperationExecutor;
use crate::processing::ImageProcessingService;
use crate::providers::http::HttpProviderOps;
use crate::providers::SharedProviderOps;
use crate::storage::{LocalBlobStore, SharedBlobStore};

pub const PROCESS_IMAGE_PATH: &str = "/myapp/process-image/";
pub const PROCESS_IMAGE_API_PATH: &str = "/api/process-image";

#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub started_unix_ms: u128,
    pub processing: ImageProcessingService,
}

impl AppState {
    pub fn new(processing: ImageProcessingService) -> Self {
        Self {
            service_name: "imaging-backend-core",
            service_version: env!("CARGO_PKG_VERSION"),
            started_unix_ms: now_unix_ms(),
            processing,
        }
    }
}

pub fn build_router(config: &ServiceConfig) -> Router {
    let providers: SharedProviderOps = Arc::new(HttpProviderOps::new(
        config.endpoints.clone(),
        config.provider_timeout,
    ));
    build_router_with_providers(config, providers)
}

pub fn build_router_with_providers(config: &ServiceConfig, providers: SharedProviderOps) -> Router {
    let store: SharedBlobStore = Arc::new(LocalBlobStore::new(
        config.media_root.clone(),
        config.media_url.clone(),
    ));
    let executor = OperationExecutor::new(providers, config.credentials.clone());
    let state = AppState::new(ImageProcessingService::new(store, executor));

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route(PROCESS_IMAGE_PATH, post(process_image_handler))
        .route(PROCESS_IMAGE_API_PATH, post(process_image_handler));
    if let Some(mount) = media_mount_path(config.media_url.as_str()) {
        router = router.nest_service(mount, ServeDir::new(config.media_root.clone()));
    }

    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: ServiceConfig) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    let app = build_router(&config);
    info!(
        bind = %config.bind,
        media_root = %config.media_root.display(),
        credentials = ?config.credentials,
        "starting imaging-backend-core HTTP surface"
    );
    axum::serve(listener, app).await
}

/// Router mount point for a local media URL prefix. Absolute URLs and the
/// bare root are not served by this process.
fn media_mount_path(media_url: &str) -> Option<&str> {
    if !media_url.starts_with('/') {
        return None;
    }
    let trimmed = media_url.trim_end_matches('/');
    (!trimmed.is_empty()).then_some(trimmed)
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "status": "ok",
            "service": state.service_name,
            "version": state.service_version,
            "started_unix_ms": state.started_unix_ms,
        })),
    )
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}

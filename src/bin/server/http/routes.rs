//! Route table for the content-focused JSON REST surface.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::{handlers, AppState};

/// Request bodies larger than this are rejected before they reach a handler; large
/// uploads are expected to stream through a delegated URL instead.
const MAX_BODY_BYTES: usize = 512 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/contents", post(handlers::create_content).get(handlers::list_content))
        .route(
            "/api/v1/contents/:id",
            get(handlers::get_content).put(handlers::update_content).delete(handlers::delete_content),
        )
        .route("/api/v1/contents/:id/derived", post(handlers::create_derived_content).get(handlers::list_derived_for_parent))
        .route("/api/v1/contents/:id/details", get(handlers::get_content_details))
        .route("/api/v1/contents/:id/upload", post(handlers::upload_to_content))
        .route("/api/v1/contents/:id/download", get(handlers::download_content))
        .route("/api/v1/contents/:id/preview", get(handlers::preview_content))
        .route("/api/v1/contents/:id/objects", post(handlers::create_object))
        .route("/api/v1/objects/:id/upload", post(handlers::upload_to_object))
        .route("/api/v1/objects/:id/download", get(handlers::download_object))
        .route("/api/v1/objects/:id/upload-url", get(handlers::object_upload_url))
        .route("/api/v1/objects/:id/download-url", get(handlers::object_download_url))
        .route("/api/v1/objects/:id/preview-url", get(handlers::object_preview_url))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

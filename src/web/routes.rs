//! Web API router construction and shared response utilities.

use axum::{
    Router,
    http::HeaderValue,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};

use crate::state::AppState;
use crate::web::middleware::request_id::RequestIdLayer;
use crate::web::{functions, status, strings, wiki};

/// Cache-Control presets for public endpoints.
pub mod cache {
    /// Key listings and value lookups; change at most once per refresh.
    pub const REFERENCE: &str = "public, max-age=300, stale-while-revalidate=300";
    /// Search results.
    pub const SEARCH: &str = "public, max-age=60, stale-while-revalidate=120";
    /// Wiki pages.
    pub const DETAIL: &str = "public, max-age=600, stale-while-revalidate=600";
}

/// Wraps a JSON response with a `Cache-Control` header.
pub fn with_cache_control<T: serde::Serialize>(value: T, header: &'static str) -> Response {
    let mut response = Json(value).into_response();
    response.headers_mut().insert(
        axum::http::header::CACHE_CONTROL,
        HeaderValue::from_static(header),
    );
    response
}

/// Creates the web server router
pub fn create_router(app_state: AppState, request_timeout: Duration) -> Router {
    let api_router = Router::new()
        .route("/health", get(status::health))
        .route("/status", get(status::status))
        .route("/strings/search", get(strings::search))
        .route("/strings/{flavor}/keys", get(strings::list_keys))
        .route("/strings/{flavor}/values", get(strings::get_values))
        .route("/functions/search", get(functions::search))
        .route("/wiki/{title}", get(wiki::get_page))
        .route("/admin/refresh", post(status::request_refresh))
        .with_state(app_state);

    Router::new().nest("/api", api_router).layer((
        // Outermost: per-request ID span + severity-proportional response logging.
        RequestIdLayer,
        CompressionLayer::new()
            .zstd(true)
            .br(true)
            .gzip(true)
            .quality(tower_http::CompressionLevel::Fastest),
        TimeoutLayer::new(request_timeout),
    ))
}

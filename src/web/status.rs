//! Health, status and admin handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, trace};

use crate::catalog::CatalogStatus;
use crate::state::AppState;
use crate::utils::fmt_duration;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// At least one dataset has never been populated.
    Starting,
    Active,
    /// Serving, but the last refresh of some dataset failed.
    Degraded,
}

impl ServiceStatus {
    fn from_catalog(status: &CatalogStatus) -> Self {
        let datasets = [&status.global_strings, &status.api_index];
        if datasets.iter().any(|d| !d.initialized) {
            Self::Starting
        } else if datasets.iter().any(|d| d.consecutive_failures > 0) {
            Self::Degraded
        } else {
            Self::Active
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    status: ServiceStatus,
    version: &'static str,
    commit: &'static str,
    uptime: String,
    #[serde(flatten)]
    catalog: CatalogStatus,
}

/// Health check endpoint
pub(super) async fn health() -> Json<Value> {
    trace!("health check requested");
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Dataset refresh state and page cache usage.
pub(super) async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let catalog = state.catalog.status();
    Json(StatusResponse {
        status: ServiceStatus::from_catalog(&catalog),
        version: env!("CARGO_PKG_VERSION"),
        commit: env!("GIT_COMMIT_HASH"),
        uptime: fmt_duration(state.started_at.elapsed()),
        catalog,
    })
}

/// `POST /api/admin/refresh`
pub(super) async fn request_refresh(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    info!("dataset refresh requested");
    state.catalog.request_refresh();
    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}

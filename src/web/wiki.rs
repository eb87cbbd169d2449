//! Wiki page handler.

use axum::extract::{Path, State};
use axum::response::Response;

use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::routes::{cache, with_cache_control};

/// `GET /api/wiki/{title}`
pub(super) async fn get_page(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> Result<Response, ApiError> {
    let page = state.catalog.lookup_content(&title).await?;
    Ok(with_cache_control(&*page, cache::DETAIL))
}

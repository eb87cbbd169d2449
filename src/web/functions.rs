//! API function name handlers.

use axum::extract::State;
use axum::response::Response;
use serde::{Deserialize, Serialize};

use crate::data::Flavor;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::routes::{cache, with_cache_control};
use crate::web::strings::parse_optional;

#[derive(Debug, Deserialize)]
pub struct FunctionSearchParams {
    pub q: String,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
    pub flavor: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionSearchResponse {
    pub query: String,
    pub flavor: Flavor,
    pub results: Vec<String>,
}

/// `GET /api/functions/search?q=..`
pub(super) async fn search(
    State(state): State<AppState>,
    axum_extra::extract::Query(params): axum_extra::extract::Query<FunctionSearchParams>,
) -> Result<Response, ApiError> {
    let flavor = parse_optional::<Flavor>(params.flavor.as_deref())?.unwrap_or_default();
    let results =
        state
            .catalog
            .search_api(&params.q, params.threshold, params.limit, Some(flavor))?;
    Ok(with_cache_control(
        FunctionSearchResponse {
            query: params.q,
            flavor,
            results,
        },
        cache::SEARCH,
    ))
}

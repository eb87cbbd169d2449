//! Global string handlers.

use axum::extract::{Path, State};
use axum::response::Response;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::catalog::SearchQuery;
use crate::data::{Flavor, Locale, LocalizedString};
use crate::error::CoreError;
use crate::state::AppState;
use crate::web::error::ApiError;
use crate::web::routes::{cache, with_cache_control};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeysResponse {
    pub flavor: Flavor,
    pub count: usize,
    pub keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ValuesParams {
    #[serde(default)]
    pub key: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuesResponse {
    pub flavor: Flavor,
    pub values: IndexMap<String, LocalizedString>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
    pub flavor: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub flavor: Flavor,
    pub locale: Locale,
    pub results: IndexMap<String, LocalizedString>,
}

/// Parse an optional query parameter through its `FromStr`.
pub(super) fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, CoreError>
where
    T: FromStr<Err = CoreError>,
{
    raw.map(str::parse).transpose()
}

/// `GET /api/strings/{flavor}/keys`
pub(super) async fn list_keys(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
) -> Result<Response, ApiError> {
    let flavor: Flavor = flavor.parse()?;
    let keys = state.catalog.list_keys(flavor)?;
    Ok(with_cache_control(
        KeysResponse {
            flavor,
            count: keys.len(),
            keys,
        },
        cache::REFERENCE,
    ))
}

/// `GET /api/strings/{flavor}/values?key=..&key=..`
pub(super) async fn get_values(
    State(state): State<AppState>,
    Path(flavor): Path<String>,
    axum_extra::extract::Query(params): axum_extra::extract::Query<ValuesParams>,
) -> Result<Response, ApiError> {
    let flavor: Flavor = flavor.parse()?;
    if params.key.is_empty() {
        return Err(ApiError::invalid_parameter("at least one 'key' is required"));
    }
    let values = state.catalog.get_values(flavor, &params.key)?;
    Ok(with_cache_control(
        ValuesResponse { flavor, values },
        cache::REFERENCE,
    ))
}

/// `GET /api/strings/search?q=..`
pub(super) async fn search(
    State(state): State<AppState>,
    axum_extra::extract::Query(params): axum_extra::extract::Query<SearchParams>,
) -> Result<Response, ApiError> {
    let flavor = parse_optional::<Flavor>(params.flavor.as_deref())?.unwrap_or_default();
    let locale = parse_optional::<Locale>(params.locale.as_deref())?.unwrap_or_default();
    let query = SearchQuery {
        query: params.q,
        threshold: params.threshold,
        limit: params.limit,
        flavor: Some(flavor),
        locale: Some(locale),
    };
    let results = state.catalog.search(&query)?;
    Ok(with_cache_control(
        SearchResponse {
            query: query.query,
            flavor,
            locale,
            results,
        },
        cache::SEARCH,
    ))
}

//! Keyword search endpoints: DB-backed and index-backed.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use super::SearchResponse;
use crate::server::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub phrase: String,
    /// 0 or absent means the service default.
    #[serde(default)]
    pub limit: u32,
}

/// `GET /api/search`: candidates from the database.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let comics = state.search.find(&params.phrase, params.limit).await?;
    let total = comics.len() as u32;
    Ok(Json(SearchResponse::new(comics, total)))
}

/// `GET /api/isearch`: candidates from the in-memory index; `total` counts
/// matches before the limit was applied.
pub async fn indexed_search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let (comics, total) = state
        .search
        .indexed_search(&params.phrase, params.limit)
        .await?;
    Ok(Json(SearchResponse::new(comics, total)))
}

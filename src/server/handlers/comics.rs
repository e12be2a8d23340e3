//! Comic browsing endpoints.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{ComicResponse, SearchResponse};
use crate::server::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// `GET /api/comics?page=&limit=`: one page in ascending id order.
pub async fn comics_list(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let (comics, total) = state.search.list(page, limit).await?;
    Ok(Json(SearchResponse::new(comics, total)))
}

/// `GET /api/comics/:id`.
pub async fn comic_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ComicResponse>> {
    let comic = state.search.get_by_id(id).await?;
    Ok(Json(ComicResponse::from(comic)))
}

/// `GET /api/comics/random`.
pub async fn comics_random(State(state): State<AppState>) -> ApiResult<Json<ComicResponse>> {
    let comic = state.search.random().await?;
    Ok(Json(ComicResponse::from(comic)))
}

//! Per-user favorites endpoints. All of them require a user token.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Serialize;

use crate::error::Error;
use crate::server::error::ApiResult;
use crate::server::middleware::AuthUser;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct FavoriteItemResponse {
    pub comic_id: i64,
    pub created_at_unix: i64,
}

#[derive(Debug, Serialize)]
pub struct FavoritesListResponse {
    pub items: Vec<FavoriteItemResponse>,
}

/// `GET /api/favorites`.
pub async fn favorites_list(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
) -> ApiResult<Json<FavoritesListResponse>> {
    let items = state.favorites.list(user_id).await?;
    Ok(Json(FavoritesListResponse {
        items: items
            .into_iter()
            .map(|f| FavoriteItemResponse {
                comic_id: f.comic_id,
                created_at_unix: f.created_at.timestamp(),
            })
            .collect(),
    }))
}

/// `POST /api/favorites/:id`. The comic must exist; the existence check and
/// the insert are not transactional, so a comic dropped in between can leave
/// a dangling favorite.
pub async fn favorites_add(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(comic_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if comic_id <= 0 {
        return Err(Error::BadArguments.into());
    }
    state.search.get_by_id(comic_id).await?;
    state.favorites.add(user_id, comic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/favorites/:id`.
pub async fn favorites_delete(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(comic_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if comic_id <= 0 {
        return Err(Error::BadArguments.into());
    }
    state.favorites.delete(user_id, comic_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

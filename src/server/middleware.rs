//! Authentication middleware.
//!
//! Tokens travel as `Authorization: Token <jwt>`. Superuser tokens gate the
//! ingest endpoints; user tokens gate favorites and put the caller's id into
//! request extensions.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use super::error::ApiError;
use super::AppState;
use crate::error::Error;

/// Authenticated caller id, inserted by `require_user`.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Token ")?.trim();
    (!token.is_empty()).then_some(token)
}

pub async fn require_superuser(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or(Error::Unauthorized)?;
    state.auth.verify_superuser(token)?;
    Ok(next.run(request).await)
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(request.headers()).ok_or(Error::Unauthorized)?;
    let user_id = state.auth.verify_user(token)?;
    request.extensions_mut().insert(AuthUser(user_id));
    Ok(next.run(request).await)
}

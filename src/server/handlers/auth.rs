//! Login and registration endpoints.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::TelegramProfile;
use crate::server::error::ApiResult;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TelegramLoginRequest {
    #[serde(default)]
    pub tg_id: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// `POST /api/auth/register`.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(Error::BadArguments.into());
    }
    let token = state.auth.register(&request.email, &request.password).await?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /api/auth/login`.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<CredentialsRequest>,
) -> ApiResult<Json<TokenResponse>> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(Error::BadArguments.into());
    }
    let token = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /api/auth/tg-login`: bot-driven telegram login, upserts the
/// account.
pub async fn tg_login(
    State(state): State<AppState>,
    Json(request): Json<TelegramLoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let profile = TelegramProfile {
        tg_id: request.tg_id,
        username: request.username,
        first_name: request.first_name,
        last_name: request.last_name,
    };
    let token = state.auth.bot_login_telegram(&profile).await?;
    Ok(Json(TokenResponse { token }))
}

/// `POST /api/login`: exchange admin credentials for a superuser token.
/// Replies with the bare token as plain text.
pub async fn admin_login(
    State(state): State<AppState>,
    Json(request): Json<AdminLoginRequest>,
) -> ApiResult<String> {
    let token = state.auth.admin_login(&request.name, &request.password)?;
    Ok(token)
}

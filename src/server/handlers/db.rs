//! Ingest administration endpoints.
//!
//! The dataset-changed event is published here, after a successful update or
//! drop, so the engine itself stays decoupled from the broker.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::Error;
use crate::models::ServiceStats;
use crate::server::error::{ApiError, ApiResult};
use crate::server::AppState;

/// `POST /api/db/update`. Runs the ingest to completion. A concurrent run is
/// acknowledged idempotently with 202 rather than treated as a failure.
pub async fn db_update(State(state): State<AppState>) -> Response {
    match state.ingest.update(state.cancel.clone()).await {
        Ok(()) => {
            state.broker.notify_db_updated();
            (StatusCode::OK, Json(json!({ "status": "started" }))).into_response()
        }
        Err(Error::AlreadyRunning) => (
            StatusCode::ACCEPTED,
            Json(json!({ "status": "already running" })),
        )
            .into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

/// `GET /api/db/status`.
pub async fn db_status(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": state.ingest.status().as_str() }))
}

/// `GET /api/db/stats`.
pub async fn db_stats(State(state): State<AppState>) -> ApiResult<Json<ServiceStats>> {
    Ok(Json(state.ingest.stats().await?))
}

/// `DELETE /api/db`. Empties the store and announces the change.
pub async fn db_drop(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.ingest.drop_all().await?;
    state.broker.notify_db_updated();
    Ok(StatusCode::OK)
}

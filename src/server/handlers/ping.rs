//! Liveness endpoint.

use std::collections::HashMap;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub replies: HashMap<&'static str, &'static str>,
}

pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let mut replies = HashMap::new();
    let db = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        tracing::warn!("ping: database unavailable");
        "unavailable"
    };
    replies.insert("db", db);
    Json(PingResponse { replies })
}

//! Router configuration for the API gateway.

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::middleware as auth_middleware;
use super::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState, search_concurrency: usize) -> Router {
    // Ingest administration is superuser-only; status and stats stay open.
    let admin_routes = Router::new()
        .route("/api/db/update", post(handlers::db_update))
        .route("/api/db", delete(handlers::db_drop))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_superuser,
        ));

    // Search shares one global in-flight cap; excess requests queue.
    let search_routes = Router::new()
        .route("/api/search", get(handlers::search))
        .route("/api/isearch", get(handlers::indexed_search))
        .layer(GlobalConcurrencyLimitLayer::new(search_concurrency.max(1)));

    let favorites_routes = Router::new()
        .route("/api/favorites", get(handlers::favorites_list))
        .route(
            "/api/favorites/:id",
            post(handlers::favorites_add).delete(handlers::favorites_delete),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware::require_user,
        ));

    Router::new()
        .route("/api/ping", get(handlers::ping))
        .route("/api/login", post(handlers::admin_login))
        .route("/api/db/status", get(handlers::db_status))
        .route("/api/db/stats", get(handlers::db_stats))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/tg-login", post(handlers::tg_login))
        .route("/api/comics", get(handlers::comics_list))
        .route("/api/comics/random", get(handlers::comics_random))
        .route("/api/comics/:id", get(handlers::comic_by_id))
        .merge(admin_routes)
        .merge(search_routes)
        .merge(favorites_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! HTTP gateway for the comic platform.
//!
//! Wires the ingest engine, search service, auth and favorites behind one
//! axum router and runs the background index refresher alongside the server.

mod error;
mod handlers;
mod middleware;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::broker::Broker;
use crate::catalog::{CatalogClient, XkcdClient};
use crate::config::Settings;
use crate::ingest::IngestService;
use crate::repository::{DbContext, FavoriteRepository};
use crate::search::{IndexRefresher, InvertedIndex, SearchService};
use crate::shutdown::{self, CancelToken};
use crate::words::{Normalizer, SnowballNormalizer};

/// Shared state for the gateway.
#[derive(Clone)]
pub struct AppState {
    pub ingest: Arc<IngestService>,
    pub search: Arc<SearchService>,
    pub auth: Arc<AuthService>,
    pub favorites: FavoriteRepository,
    pub db: DbContext,
    pub broker: Broker,
    /// Process-wide cancellation, threaded into long-running operations.
    pub cancel: CancelToken,
}

/// Start the gateway and block until shutdown.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = DbContext::from_url(&settings.database_url());
    ctx.init_schema().await?;

    let catalog: Arc<dyn CatalogClient> =
        Arc::new(XkcdClient::new(&settings.xkcd_url, settings.xkcd_timeout())?);
    let words: Arc<dyn Normalizer> = Arc::new(SnowballNormalizer);
    let broker = Broker::new();
    let (shutdown_handle, cancel) = shutdown::channel();

    let ingest = Arc::new(IngestService::new(
        ctx.comics(),
        catalog,
        Arc::clone(&words),
        settings.concurrency,
    )?);
    let search = Arc::new(SearchService::new(
        ctx.comics(),
        words,
        Arc::new(InvertedIndex::new()),
    ));
    let auth = Arc::new(AuthService::new(
        ctx.users(),
        &settings.jwt_secret,
        settings.token_ttl(),
        &settings.admin_user,
        &settings.admin_password,
    )?);

    let refresher = IndexRefresher::new(Arc::clone(&search), broker.clone(), settings.index_ttl())
        .start(cancel.clone());

    let state = AppState {
        ingest,
        search,
        auth,
        favorites: ctx.favorites(),
        db: ctx,
        broker,
        cancel,
    };
    let app = create_router(state, settings.search_concurrency);

    let addr: SocketAddr = format!("{}:{}", settings.http_host, settings.http_port).parse()?;
    tracing::info!("starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;

    // Stop the refresher (and any in-flight ingest) before exiting.
    shutdown_handle.cancel();
    let _ = refresher.await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::error::{Error, Result};
    use crate::models::{Comic, ComicInfo};
    use crate::repository::ComicRepository;
    use crate::shutdown::CancelHandle;
    use async_trait::async_trait;

    struct TestCatalog {
        latest: i64,
        entries: HashMap<i64, ComicInfo>,
        latest_delay: Duration,
    }

    impl TestCatalog {
        fn new(latest: i64, entries: Vec<ComicInfo>) -> Self {
            Self {
                latest,
                entries: entries.into_iter().map(|e| (e.id, e)).collect(),
                latest_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl CatalogClient for TestCatalog {
        async fn latest_id(&self) -> Result<i64> {
            if !self.latest_delay.is_zero() {
                tokio::time::sleep(self.latest_delay).await;
            }
            Ok(self.latest)
        }

        async fn get(&self, id: i64) -> Result<ComicInfo> {
            self.entries.get(&id).cloned().ok_or(Error::NotFound)
        }
    }

    struct TestApp {
        app: Router,
        state: AppState,
        repo: ComicRepository,
        _shutdown: CancelHandle,
        _dir: tempfile::TempDir,
    }

    async fn setup(catalog: TestCatalog) -> TestApp {
        let dir = tempdir().unwrap();
        let ctx = DbContext::new(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();
        let repo = ctx.comics();

        let words: Arc<dyn Normalizer> = Arc::new(SnowballNormalizer);
        let (shutdown_handle, cancel) = shutdown::channel();

        let ingest = Arc::new(
            IngestService::new(repo.clone(), Arc::new(catalog), Arc::clone(&words), 4).unwrap(),
        );
        let search = Arc::new(SearchService::new(
            repo.clone(),
            words,
            Arc::new(InvertedIndex::new()),
        ));
        let auth = Arc::new(
            AuthService::new(
                ctx.users(),
                "test-secret",
                Duration::from_secs(3600),
                "admin",
                "hunter2",
            )
            .unwrap(),
        );

        let state = AppState {
            ingest,
            search,
            auth,
            favorites: ctx.favorites(),
            db: ctx,
            broker: Broker::new(),
            cancel,
        };
        let app = create_router(state.clone(), 16);

        TestApp {
            app,
            state,
            repo,
            _shutdown: shutdown_handle,
            _dir: dir,
        }
    }

    fn entry(id: i64, title: &str, alt: &str, transcript: &str) -> ComicInfo {
        ComicInfo {
            id,
            img_url: format!("https://imgs.example.com/{id}.png"),
            title: title.to_string(),
            alt: alt.to_string(),
            transcript: transcript.to_string(),
        }
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Token {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or(serde_json::Value::String(
                    String::from_utf8_lossy(&bytes).to_string(),
                ))
        };
        (status, json)
    }

    async fn admin_token(app: &Router) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/login",
            None,
            Some(serde_json::json!({ "name": "admin", "password": "hunter2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body.as_str().unwrap().to_string()
    }

    async fn user_token(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({ "email": email, "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    fn comic(id: i64, title: &[&str]) -> Comic {
        Comic {
            id,
            img_url: format!("https://example.com/{id}.png"),
            title: title.iter().map(|s| s.to_string()).collect(),
            alt: Vec::new(),
            words: Vec::new(),
            fetched_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn ping_reports_db() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;
        let (status, body) = send(&test.app, "GET", "/api/ping", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["replies"]["db"], "ok");
    }

    #[tokio::test]
    async fn search_validation_maps_to_400() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;

        for uri in [
            "/api/search?phrase=",
            "/api/search?phrase=the",
            "/api/search?phrase=fox&limit=101",
            "/api/isearch?phrase=",
            "/api/isearch?phrase=the",
            "/api/isearch?phrase=fox&limit=101",
        ] {
            let (status, body) = send(&test.app, "GET", uri, None, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "uri {uri}");
            assert!(body["error"].is_string(), "uri {uri}");
        }
    }

    #[tokio::test]
    async fn search_paths_agree_over_http() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;
        test.repo.upsert(&comic(1, &["hello", "world"])).await.unwrap();
        test.repo.upsert(&comic(2, &["hello"])).await.unwrap();
        test.state.search.rebuild_index().await.unwrap();

        let (status, db_body) =
            send(&test.app, "GET", "/api/search?phrase=hello%20world", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, index_body) =
            send(&test.app, "GET", "/api/isearch?phrase=hello%20world", None, None).await;
        assert_eq!(status, StatusCode::OK);

        assert_eq!(db_body["comics"], index_body["comics"]);
        assert_eq!(db_body["comics"][0]["id"], 1);
        assert_eq!(db_body["comics"][1]["id"], 2);
        assert_eq!(index_body["total"], 2);
    }

    #[tokio::test]
    async fn admin_endpoints_require_superuser() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;

        let (status, _) = send(&test.app, "POST", "/api/db/update", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&test.app, "DELETE", "/api/db", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // A user token is not enough.
        let token = user_token(&test.app, "user@example.com").await;
        let (status, _) = send(&test.app, "POST", "/api/db/update", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // Status and stats stay open.
        let (status, body) = send(&test.app, "GET", "/api/db/status", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "idle");
    }

    #[tokio::test]
    async fn update_ingests_and_publishes_one_event() {
        let test = setup(TestCatalog::new(
            3,
            vec![
                entry(1, "Hello World", "alt", "the quick brown fox"),
                entry(3, "Hello World", "alt", "the quick brown fox"),
            ],
        ))
        .await;
        let token = admin_token(&test.app).await;
        let mut events = test.state.broker.subscribe();

        let (status, body) = send(&test.app, "POST", "/api/db/update", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "started");

        // Exactly one dataset-changed event for the run.
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());

        let (status, body) = send(&test.app, "GET", "/api/db/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comics_fetched"], 3);
        assert_eq!(body["comics_total"], 3);

        // Placeholder row 2 exists and serves over the comics API.
        let (status, body) = send(&test.app, "GET", "/api/comics/2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["url"], "");
    }

    #[tokio::test]
    async fn concurrent_update_is_acknowledged_with_202() {
        let mut catalog = TestCatalog::new(1, vec![entry(1, "a", "", "")]);
        catalog.latest_delay = Duration::from_millis(300);
        let test = setup(catalog).await;
        let token = admin_token(&test.app).await;

        let first = {
            let app = test.app.clone();
            let token = token.clone();
            tokio::spawn(async move { send(&app, "POST", "/api/db/update", Some(&token), None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (status, body) = send(&test.app, "POST", "/api/db/update", Some(&token), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["status"], "already running");

        let (status, body) = send(&test.app, "GET", "/api/db/status", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "running");

        let (status, _) = first.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn drop_empties_store_and_publishes() {
        let test = setup(TestCatalog::new(2, vec![entry(1, "a", "", ""), entry(2, "b", "", "")]))
            .await;
        let token = admin_token(&test.app).await;

        let (status, _) = send(&test.app, "POST", "/api/db/update", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let mut events = test.state.broker.subscribe();
        let (status, _) = send(&test.app, "DELETE", "/api/db", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(events.try_recv().is_ok());
        assert!(events.try_recv().is_err());

        let (status, body) = send(&test.app, "GET", "/api/db/stats", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comics_fetched"], 0);
    }

    #[tokio::test]
    async fn admin_login_rejects_bad_credentials() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;
        let (status, _) = send(
            &test.app,
            "POST",
            "/api/login",
            None,
            Some(serde_json::json!({ "name": "admin", "password": "wrong" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_login_and_conflicts() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;

        let _token = user_token(&test.app, "a@example.com").await;

        let (status, _) = send(
            &test.app,
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({ "email": "a@example.com", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &test.app,
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": "a@example.com", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["token"].is_string());

        let (status, _) = send(
            &test.app,
            "POST",
            "/api/auth/login",
            None,
            Some(serde_json::json!({ "email": "a@example.com", "password": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            &test.app,
            "POST",
            "/api/auth/register",
            None,
            Some(serde_json::json!({ "email": "not-an-email", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn favorites_flow() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;
        test.repo.upsert(&comic(5, &["fox"])).await.unwrap();

        // No token: unauthorized.
        let (status, _) = send(&test.app, "GET", "/api/favorites", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = user_token(&test.app, "fan@example.com").await;

        let (status, _) = send(&test.app, "POST", "/api/favorites/5", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Duplicate add conflicts; unknown comic is not found.
        let (status, _) = send(&test.app, "POST", "/api/favorites/5", Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (status, _) = send(&test.app, "POST", "/api/favorites/99", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&test.app, "GET", "/api/favorites", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
        assert_eq!(body["items"][0]["comic_id"], 5);

        let (status, _) = send(&test.app, "DELETE", "/api/favorites/5", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&test.app, "DELETE", "/api/favorites/5", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn comics_endpoints() {
        let test = setup(TestCatalog::new(0, Vec::new())).await;
        for id in [1, 2, 3] {
            test.repo.upsert(&comic(id, &["x"])).await.unwrap();
        }

        let (status, body) = send(&test.app, "GET", "/api/comics?page=1&limit=2", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["comics"].as_array().unwrap().len(), 2);
        assert_eq!(body["total"], 3);

        let (status, _) = send(&test.app, "GET", "/api/comics?page=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&test.app, "GET", "/api/comics/3", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 3);

        let (status, _) = send(&test.app, "GET", "/api/comics/42", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(&test.app, "GET", "/api/comics/random", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["id"].as_i64().unwrap() >= 1);
    }
}

//! Configuration: defaults, optional TOML file, environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, config file values,
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "comichub.db";

/// Runtime settings after all layers are applied.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base data directory.
    pub data_dir: PathBuf,
    /// Database filename inside `data_dir`.
    pub database_filename: String,
    /// Database URL; overrides `data_dir`/`database_filename` when set.
    pub database_url: Option<String>,
    /// HTTP listen host.
    pub http_host: String,
    /// HTTP listen port.
    pub http_port: u16,
    /// Catalog base URL.
    pub xkcd_url: String,
    /// Per-request catalog timeout in seconds.
    pub xkcd_timeout_secs: u64,
    /// Ingest worker count (capped at 64 inside the engine).
    pub concurrency: usize,
    /// Index refresh interval in seconds.
    pub index_ttl_secs: u64,
    /// Max in-flight search requests.
    pub search_concurrency: usize,
    /// Admin credentials for `POST /api/login`.
    pub admin_user: String,
    pub admin_password: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_filename: DEFAULT_DATABASE_FILENAME.to_string(),
            database_url: None,
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            xkcd_url: "https://xkcd.com".to_string(),
            xkcd_timeout_secs: 30,
            concurrency: 8,
            index_ttl_secs: 300,
            search_concurrency: 16,
            admin_user: "admin".to_string(),
            admin_password: String::new(),
            jwt_secret: "comichub-dev-secret".to_string(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl Settings {
    /// The database URL, constructed from the path when not explicitly set.
    pub fn database_url(&self) -> String {
        if let Some(ref url) = self.database_url {
            url.clone()
        } else {
            format!("sqlite:{}", self.database_path().display())
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    pub fn xkcd_timeout(&self) -> Duration {
        Duration::from_secs(self.xkcd_timeout_secs)
    }

    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

/// Config file shape. Every field is optional; missing values keep their
/// defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub data_dir: Option<String>,
    pub database: Option<String>,
    pub database_url: Option<String>,
    pub http_host: Option<String>,
    pub http_port: Option<u16>,
    pub xkcd_url: Option<String>,
    pub xkcd_timeout_secs: Option<u64>,
    pub concurrency: Option<usize>,
    pub index_ttl_secs: Option<u64>,
    pub search_concurrency: Option<usize>,
    pub admin_user: Option<String>,
    pub admin_password: Option<String>,
    pub jwt_secret: Option<String>,
    pub token_ttl_secs: Option<u64>,
}

impl Config {
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("read config file: {e}"))?;
        toml::from_str(&contents).map_err(|e| format!("parse config file: {e}"))
    }

    fn apply_to_settings(&self, settings: &mut Settings) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = PathBuf::from(data_dir);
        }
        if let Some(ref database) = self.database {
            settings.database_filename = database.clone();
        }
        if let Some(ref url) = self.database_url {
            settings.database_url = Some(url.clone());
        }
        if let Some(ref host) = self.http_host {
            settings.http_host = host.clone();
        }
        if let Some(port) = self.http_port {
            settings.http_port = port;
        }
        if let Some(ref url) = self.xkcd_url {
            settings.xkcd_url = url.clone();
        }
        if let Some(timeout) = self.xkcd_timeout_secs {
            settings.xkcd_timeout_secs = timeout;
        }
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if let Some(ttl) = self.index_ttl_secs {
            settings.index_ttl_secs = ttl;
        }
        if let Some(limit) = self.search_concurrency {
            settings.search_concurrency = limit;
        }
        if let Some(ref user) = self.admin_user {
            settings.admin_user = user.clone();
        }
        if let Some(ref password) = self.admin_password {
            settings.admin_password = password.clone();
        }
        if let Some(ref secret) = self.jwt_secret {
            settings.jwt_secret = secret.clone();
        }
        if let Some(ttl) = self.token_ttl_secs {
            settings.token_ttl_secs = ttl;
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

/// Load settings: defaults, then the config file (when given or when
/// `comichub.toml` exists in the working directory), then the environment.
pub async fn load_settings(config_path: Option<&Path>, data_dir: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let discovered = PathBuf::from("comichub.toml");
    let path = config_path
        .map(Path::to_path_buf)
        .or_else(|| discovered.exists().then_some(discovered));

    if let Some(path) = path {
        match Config::load_from_path(&path).await {
            Ok(config) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                config.apply_to_settings(&mut settings);
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), err, "config file ignored");
            }
        }
    }

    if let Some(dir) = data_dir {
        settings.data_dir = dir.to_path_buf();
    }

    // Environment takes highest precedence.
    if let Some(url) = env_var("DATABASE_URL") {
        settings.database_url = Some(url);
    }
    if let Some(url) = env_var("XKCD_URL") {
        settings.xkcd_url = url;
    }
    if let Some(user) = env_var("COMICHUB_ADMIN_USER") {
        settings.admin_user = user;
    }
    if let Some(password) = env_var("COMICHUB_ADMIN_PASSWORD") {
        settings.admin_password = password;
    }
    if let Some(secret) = env_var("COMICHUB_JWT_SECRET") {
        settings.jwt_secret = secret;
    }
    if let Some(port) = env_var("COMICHUB_HTTP_PORT").and_then(|p| p.parse().ok()) {
        settings.http_port = port;
    }
    if let Some(concurrency) = env_var("COMICHUB_CONCURRENCY").and_then(|c| c.parse().ok()) {
        settings.concurrency = concurrency;
    }

    settings
}

//! Configuration module for the folder tree backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::DOCUMENT_FILE_NAME;

/// Access to the remote version-controlled store.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repository: Option<String>,
    pub path: String,
    /// Base URL of the contents API
    pub api_base: String,
}

impl RemoteConfig {
    /// Credentials count only when every field is non-blank.
    pub fn is_configured(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.token)
            && filled(&self.owner)
            && filled(&self.repository)
            && !self.path.trim().is_empty()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Path to the SQLite local cache
    pub cache_path: PathBuf,
    /// URL of the canonical tree document
    pub origin_url: Option<String>,
    /// URL of the credentials file; authentication is disabled when unset
    pub credentials_url: Option<String>,
    pub remote: RemoteConfig,
    /// Push to the remote store after every save, not only when the origin rejects it
    pub auto_sync: bool,
    pub push_debounce: Duration,
    pub status_ttl: Duration,
    pub session_idle: Duration,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn millis_var(key: &str, default: u64) -> Duration {
    Duration::from_millis(
        env::var(key)
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default),
    )
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("TREE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid TREE_BIND_ADDR format");

        let log_level = env::var("TREE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_json = env::var("TREE_LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let cache_path = env::var("TREE_CACHE_PATH")
            .unwrap_or_else(|_| "./data/cache.sqlite".to_string())
            .into();

        let remote = RemoteConfig {
            token: non_empty_var("TREE_REMOTE_TOKEN"),
            owner: non_empty_var("TREE_REMOTE_OWNER"),
            repository: non_empty_var("TREE_REMOTE_REPO"),
            path: non_empty_var("TREE_REMOTE_PATH")
                .unwrap_or_else(|| DOCUMENT_FILE_NAME.to_string()),
            api_base: non_empty_var("TREE_REMOTE_API")
                .unwrap_or_else(|| "https://api.github.com".to_string()),
        };

        let auto_sync = env::var("TREE_AUTO_SYNC")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let session_idle_secs = env::var("TREE_SESSION_IDLE_SECS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(600);

        Self {
            bind_addr,
            log_level,
            log_json,
            cache_path,
            origin_url: non_empty_var("TREE_ORIGIN_URL"),
            credentials_url: non_empty_var("TREE_CREDENTIALS_URL"),
            remote,
            auto_sync,
            push_debounce: millis_var("TREE_PUSH_DEBOUNCE_MS", 1200),
            status_ttl: millis_var("TREE_STATUS_TTL_MS", 3500),
            session_idle: Duration::from_secs(session_idle_secs),
        }
    }
}

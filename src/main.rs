//! Folder Tree Backend
//!
//! A REST backend for a tagged folder tree, cached locally in SQLite and synced
//! to a canonical origin document and a version-controlled remote store.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod filter;
mod models;
mod origin;
mod persistence;
mod remote;
mod status;
mod store;
mod tags;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::SessionManager;
use config::Config;
use db::CacheRepository;
use origin::OriginClient;
use persistence::{Debouncer, Persistence};
use remote::RemoteSyncClient;
use status::StatusBoard;
use store::TreeStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<TreeStore>,
    pub sessions: Arc<SessionManager>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Folder Tree Backend");
    tracing::info!("Cache path: {:?}", config.cache_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.credentials_url.is_none() {
        tracing::warn!("No credentials file configured (TREE_CREDENTIALS_URL). Authentication is disabled!");
    }
    if config.origin_url.is_none() {
        tracing::warn!("No origin document configured (TREE_ORIGIN_URL). Using the local cache only");
    }

    // Initialize local cache
    let pool = db::init_database(&config.cache_path).await?;
    let cache = CacheRepository::new(pool);

    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let remote = RemoteSyncClient::from_config(http.clone(), &config.remote);
    if remote.is_none() {
        tracing::info!("Remote store not configured; push and pull are unavailable");
    }

    let persistence = Persistence::new(
        cache,
        config
            .origin_url
            .clone()
            .map(|url| OriginClient::new(http.clone(), url)),
        remote,
        config.auto_sync,
        Debouncer::new(config.push_debounce),
        Arc::new(StatusBoard::new(config.status_ttl)),
    );

    // Load the tree before accepting requests
    let store = Arc::new(TreeStore::open(persistence).await);
    let info = store.revision_info().await;
    tracing::info!("Tree ready with {} nodes", info.node_count);

    let sessions = Arc::new(SessionManager::new(
        config.credentials_url.clone(),
        http,
        config.session_idle,
    ));

    // Create application state
    let state = AppState {
        store,
        sessions,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let sessions = Arc::clone(&state.sessions);

    // API routes
    let api_routes = Router::new()
        // Nodes
        .route("/nodes", get(api::list_nodes).post(api::create_node))
        .route(
            "/nodes/{id}",
            get(api::get_node)
                .put(api::update_node)
                .delete(api::delete_node),
        )
        .route("/nodes/{id}/parent", put(api::move_node))
        .route("/nodes/{id}/toggle", post(api::toggle_node))
        .route("/nodes/{id}/children", get(api::list_children))
        .route("/nodes/{id}/root", get(api::get_root_of))
        .route("/nodes/{id}/has-tag", get(api::subtree_has_tag))
        .route("/roots", get(api::list_roots))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/filter", post(api::apply_filter))
        // Documents
        .route("/export", get(api::export_document))
        .route("/import", post(api::import_document))
        // Sync
        .route("/sync/push", post(api::push))
        .route("/sync/pull", post(api::pull))
        .route("/status", get(api::get_status))
        // Apply session auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::session_auth_layer(Arc::clone(&sessions), req, next)
        }));

    // Health check and login (no session required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/session", post(api::login).delete(api::logout));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests;

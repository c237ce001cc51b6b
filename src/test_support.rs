//! In-process stand-ins for the origin host and the remote contents API.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Serve `router` on a random local port and return its base URL.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A URL nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");
    drop(listener);
    format!("http://{}/data-tree.json", addr)
}

// ==================== ORIGIN HOST ====================

#[derive(Default)]
struct OriginState {
    document: Option<String>,
    accept_puts: bool,
    puts: usize,
    credentials: Option<String>,
}

/// Origin host serving `/data-tree.json` and `/data/auth.json`.
#[derive(Clone, Default)]
pub struct FakeOrigin {
    inner: Arc<Mutex<OriginState>>,
}

impl FakeOrigin {
    pub fn router(&self) -> Router {
        Router::new()
            .route("/data-tree.json", get(origin_get).put(origin_put))
            .route("/data/auth.json", get(credentials_get))
            .with_state(self.clone())
    }

    pub async fn set_document(&self, document: &str) {
        self.inner.lock().await.document = Some(document.to_string());
    }

    pub async fn document(&self) -> Option<String> {
        self.inner.lock().await.document.clone()
    }

    pub async fn accept_puts(&self, accept: bool) {
        self.inner.lock().await.accept_puts = accept;
    }

    pub async fn put_count(&self) -> usize {
        self.inner.lock().await.puts
    }

    pub async fn set_credentials(&self, credentials: Value) {
        self.inner.lock().await.credentials = Some(credentials.to_string());
    }
}

async fn origin_get(State(origin): State<FakeOrigin>) -> Response {
    match origin.inner.lock().await.document.clone() {
        Some(document) => document.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn origin_put(State(origin): State<FakeOrigin>, body: String) -> Response {
    let mut state = origin.inner.lock().await;
    state.puts += 1;
    if !state.accept_puts {
        return (StatusCode::METHOD_NOT_ALLOWED, "read-only host").into_response();
    }
    state.document = Some(body);
    StatusCode::NO_CONTENT.into_response()
}

async fn credentials_get(State(origin): State<FakeOrigin>) -> Response {
    match origin.inner.lock().await.credentials.clone() {
        Some(credentials) => credentials.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

// ==================== CONTENTS API ====================

#[derive(Default)]
struct ContentsState {
    /// path -> (base64 content, sha)
    files: HashMap<String, (String, String)>,
    puts: Vec<Value>,
    reject_next: Option<(u16, String)>,
    counter: u64,
}

/// Contents API keeping files in memory and enforcing revision markers.
#[derive(Clone, Default)]
pub struct FakeContentsApi {
    inner: Arc<Mutex<ContentsState>>,
}

impl FakeContentsApi {
    pub fn router(&self) -> Router {
        Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(contents_get).put(contents_put),
            )
            .with_state(self.clone())
    }

    /// Bodies of every PUT received, in order.
    pub async fn put_requests(&self) -> Vec<Value> {
        self.inner.lock().await.puts.clone()
    }

    pub async fn reject_next_put(&self, status: u16, body: &str) {
        self.inner.lock().await.reject_next = Some((status, body.to_string()));
    }

    /// Decoded content of a stored file.
    pub async fn file(&self, path: &str) -> Option<String> {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
        let state = self.inner.lock().await;
        let (encoded, _) = state.files.get(path)?;
        let packed: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        String::from_utf8(BASE64.decode(packed).ok()?).ok()
    }

    /// Store a file as if it had been committed externally.
    pub async fn seed_file(&self, path: &str, content: &str) {
        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
        let mut state = self.inner.lock().await;
        state.counter += 1;
        let sha = format!("external{}", state.counter);
        state
            .files
            .insert(path.to_string(), (BASE64.encode(content), sha));
    }
}

/// Wrap base64 at 60 columns like the real API does.
fn wrap_base64(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(60)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn contents_get(
    State(api): State<FakeContentsApi>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
) -> Response {
    let state = api.inner.lock().await;
    match state.files.get(&path) {
        Some((content, sha)) => Json(json!({
            "path": path,
            "encoding": "base64",
            "content": wrap_base64(content),
            "sha": sha,
        }))
        .into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "Not Found" }))).into_response(),
    }
}

async fn contents_put(
    State(api): State<FakeContentsApi>,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = api.inner.lock().await;
    state.puts.push(body.clone());

    if let Some((status, message)) = state.reject_next.take() {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::CONFLICT);
        return (status, message).into_response();
    }

    let current = state.files.get(&path).map(|(_, sha)| sha.clone());
    let given = body.get("sha").and_then(Value::as_str).map(str::to_string);
    if current != given {
        return (StatusCode::CONFLICT, "sha does not match").into_response();
    }

    let content = body
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.counter += 1;
    let sha = format!("sha{}", state.counter);
    state.files.insert(path.clone(), (content, sha.clone()));

    Json(json!({
        "content": { "path": path, "sha": sha },
        "commit": { "sha": format!("commit{}", state.counter) },
    }))
    .into_response()
}

//! Integration tests for the folder tree backend.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::SessionManager;
use crate::config::{Config, RemoteConfig};
use crate::db::{init_database, CacheRepository, SNAPSHOT_KEY};
use crate::models::DOCUMENT_FILE_NAME;
use crate::origin::OriginClient;
use crate::persistence::{Debouncer, Persistence};
use crate::remote::RemoteSyncClient;
use crate::status::StatusBoard;
use crate::store::TreeStore;
use crate::test_support::{spawn_server, FakeContentsApi, FakeOrigin};
use crate::{create_router, AppState};

#[derive(Default)]
struct FixtureOptions {
    origin: Option<FakeOrigin>,
    contents: Option<FakeContentsApi>,
    require_login: bool,
    cached: Option<&'static str>,
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_options(FixtureOptions::default()).await
    }

    async fn with_options(options: FixtureOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache_path = temp_dir.path().join("cache.sqlite");

        // Initialize local cache
        let pool = init_database(&cache_path).await.expect("Failed to init cache");
        let cache = CacheRepository::new(pool);
        if let Some(raw) = options.cached {
            cache.put_slot(SNAPSHOT_KEY, raw).await.unwrap();
        }

        let origin_base = match &options.origin {
            Some(origin) => Some(spawn_server(origin.router()).await),
            None => None,
        };
        let api_base = match &options.contents {
            Some(api) => spawn_server(api.router()).await,
            None => "https://api.github.com".to_string(),
        };

        let config = Config {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            log_json: false,
            cache_path,
            origin_url: origin_base
                .as_ref()
                .map(|base| format!("{}/{}", base, DOCUMENT_FILE_NAME)),
            credentials_url: origin_base
                .as_ref()
                .filter(|_| options.require_login)
                .map(|base| format!("{}/data/auth.json", base)),
            remote: RemoteConfig {
                token: options.contents.as_ref().map(|_| "secret".to_string()),
                owner: Some("acme".to_string()),
                repository: Some("trees".to_string()),
                path: DOCUMENT_FILE_NAME.to_string(),
                api_base,
            },
            auto_sync: false,
            push_debounce: Duration::from_millis(50),
            status_ttl: Duration::from_secs(5),
            session_idle: Duration::from_secs(60),
        };

        let http = Client::new();
        let persistence = Persistence::new(
            cache,
            config
                .origin_url
                .clone()
                .map(|url| OriginClient::new(http.clone(), url)),
            RemoteSyncClient::from_config(http.clone(), &config.remote),
            config.auto_sync,
            Debouncer::new(config.push_debounce),
            Arc::new(StatusBoard::new(config.status_ttl)),
        );

        let state = AppState {
            store: Arc::new(TreeStore::open(persistence).await),
            sessions: Arc::new(SessionManager::new(
                config.credentials_url.clone(),
                http,
                config.session_idle,
            )),
            config: Arc::new(config),
        };

        let base_url = spawn_server(create_router(state)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, body).await
    }

    async fn put(&self, path: &str, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::PUT, path, body).await
    }

    async fn delete(&self, path: &str) -> (u16, Value) {
        let resp = self.client.delete(self.url(path)).send().await.unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    /// Id of the first node with `name`.
    async fn id_of(&self, name: &str) -> String {
        let (_, body) = self.get("/api/nodes").await;
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["name"] == name)
            .map(|n| n["id"].as_str().unwrap().to_string())
            .unwrap_or_else(|| panic!("no node named {}", name))
    }
}

fn names(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_empty_start_installs_sample_tree() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/roots").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(names(&body), vec!["Documentos", "Proyectos"]);
    assert_eq!(body["revisionId"], 1);

    let proyectos = fixture.id_of("Proyectos").await;
    let (_, children) = fixture
        .get(&format!("/api/nodes/{}/children", proyectos))
        .await;
    assert_eq!(names(&children), vec!["Proyecto A"]);
    assert_eq!(children["data"][0]["tags"], json!(["proyecto", "urgent"]));
}

#[tokio::test]
async fn test_create_update_and_cycle_rejection() {
    let fixture = TestFixture::with_options(FixtureOptions {
        cached: Some("[]"),
        ..Default::default()
    })
    .await;

    // An empty cached document is still "nothing usable"
    let (_, roots) = fixture.get("/api/roots").await;
    assert_eq!(roots["data"].as_array().unwrap().len(), 2);

    let (status, body) = fixture.post("/api/nodes", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "New root");
    assert!(body["data"]["parentId"].is_null());
    let root_id = body["data"]["id"].as_str().unwrap().to_string();
    assert!(root_id.starts_with("n_"));

    let (status, body) = fixture
        .post(
            "/api/nodes",
            json!({"parentId": root_id, "name": "Child", "tags": "a, b,, a"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["tags"], json!(["a", "b"]));
    assert_eq!(body["data"]["collapsed"], false);
    let child_id = body["data"]["id"].as_str().unwrap().to_string();

    // Partial update keeps the other fields
    let (status, body) = fixture
        .put(
            &format!("/api/nodes/{}", child_id),
            json!({"description": "only this"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Child");
    assert_eq!(body["data"]["description"], "only this");
    assert_eq!(body["data"]["tags"], json!(["a", "b"]));

    // Tags given as a list are normalized the same way
    let (_, body) = fixture
        .put(
            &format!("/api/nodes/{}", child_id),
            json!({"tags": [" x ", "x", "y"]}),
        )
        .await;
    assert_eq!(body["data"]["tags"], json!(["x", "y"]));

    // Moving a node under its own descendant is rejected without change
    let before = fixture.get("/api/nodes").await.1;
    let (status, body) = fixture
        .put(
            &format!("/api/nodes/{}/parent", root_id),
            json!({"parentId": child_id}),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "WOULD_CREATE_CYCLE");
    let after = fixture.get("/api/nodes").await.1;
    assert_eq!(before["data"], after["data"]);
    assert_eq!(before["revisionId"], after["revisionId"]);

    let (status, _) = fixture
        .put(
            &format!("/api/nodes/{}/parent", root_id),
            json!({"parentId": root_id}),
        )
        .await;
    assert_eq!(status, 409);

    // Detaching makes the child a root
    let (status, body) = fixture
        .put(
            &format!("/api/nodes/{}/parent", child_id),
            json!({"parentId": null}),
        )
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["parentId"].is_null());
    let (_, roots) = fixture.get("/api/roots").await;
    assert!(names(&roots).contains(&"Child".to_string()));
}

#[tokio::test]
async fn test_unknown_ids_return_not_found() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get("/api/nodes/n_missing").await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let (status, _) = fixture
        .post("/api/nodes", json!({"parentId": "n_missing"}))
        .await;
    assert_eq!(status, 404);

    let (status, _) = fixture.delete("/api/nodes/n_missing").await;
    assert_eq!(status, 404);

    let (status, _) = fixture
        .put("/api/nodes/n_missing/parent", json!({"parentId": null}))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_delete_removes_subtree() {
    let fixture = TestFixture::new().await;
    let proyectos = fixture.id_of("Proyectos").await;
    let proyecto_a = fixture.id_of("Proyecto A").await;

    let (status, body) = fixture
        .delete(&format!("/api/nodes/{}", proyectos))
        .await;
    assert_eq!(status, 200);
    let removed = body["data"]["removedIds"].as_array().unwrap();
    assert_eq!(removed.len(), 2);

    let (status, _) = fixture.get(&format!("/api/nodes/{}", proyecto_a)).await;
    assert_eq!(status, 404);
    let (_, roots) = fixture.get("/api/roots").await;
    assert_eq!(names(&roots), vec!["Documentos"]);
}

#[tokio::test]
async fn test_tag_filter_expands_matching_branches() {
    let fixture = TestFixture::new().await;
    let proyecto_a = fixture.id_of("Proyecto A").await;

    let (_, tags) = fixture.get("/api/tags").await;
    assert_eq!(tags["data"], json!(["docs", "inicio", "proyecto", "urgent"]));

    let (status, body) = fixture.post("/api/filter", json!({"tag": "urgent"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["matchingIds"], json!([proyecto_a]));

    let (_, nodes) = fixture.get("/api/nodes").await;
    let collapsed = |name: &str| {
        nodes["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|n| n["name"] == name)
            .unwrap()["collapsed"]
            .as_bool()
            .unwrap()
    };
    assert!(!collapsed("Proyectos"));
    assert!(!collapsed("Proyecto A"));
    assert!(collapsed("Documentos"));

    let proyectos = fixture.id_of("Proyectos").await;
    let (_, body) = fixture
        .get(&format!("/api/nodes/{}/has-tag?tag=urgent", proyectos))
        .await;
    assert_eq!(body["data"], true);
    let (_, body) = fixture
        .get(&format!("/api/nodes/{}/has-tag?tag=docs", proyectos))
        .await;
    assert_eq!(body["data"], false);

    // Blank tag clears the filter without a save
    let revision = nodes["revisionId"].clone();
    let (_, body) = fixture.post("/api/filter", json!({"tag": "  "})).await;
    assert_eq!(body["data"]["matchingIds"], json!([]));
    assert_eq!(body["revisionId"], revision);

    // Toggle flips a single node
    let documentos = fixture.id_of("Documentos").await;
    let (_, body) = fixture
        .post(&format!("/api/nodes/{}/toggle", documentos), json!({}))
        .await;
    assert_eq!(body["data"]["collapsed"], false);
}

#[tokio::test]
async fn test_export_and_import() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/api/export"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"data-tree.json\"");
    let exported: Value = serde_json::from_str(&resp.text().await.unwrap()).unwrap();
    assert_eq!(exported.as_array().unwrap().len(), 3);

    // A non-array document is rejected and nothing changes
    let before = fixture.get("/api/nodes").await.1;
    let resp = fixture
        .client
        .post(fixture.url("/api/import"))
        .body(r#"{"id":"x","name":"lonely"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let after = fixture.get("/api/nodes").await.1;
    assert_eq!(before, after);

    // Legacy nodes without the newer fields are migrated
    let resp = fixture
        .client
        .post(fixture.url("/api/import"))
        .body(r#"[{"id":"r","parentId":null,"name":"Root"},{"id":"c","parentId":"r"}]"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["nodeCount"], 2);

    let (_, node) = fixture.get("/api/nodes/c").await;
    assert_eq!(node["data"]["name"], "");
    assert_eq!(node["data"]["description"], "");
    assert_eq!(node["data"]["tags"], json!([]));
    assert_eq!(node["data"]["collapsed"], false);

    let (_, root) = fixture.get("/api/nodes/c/root").await;
    assert_eq!(root["data"]["id"], "r");
}

#[tokio::test]
async fn test_origin_document_wins_on_startup() {
    let origin = FakeOrigin::default();
    origin
        .set_document(r#"[{"id":"o1","parentId":null,"name":"From origin","tags":["x"]}]"#)
        .await;
    let fixture = TestFixture::with_options(FixtureOptions {
        origin: Some(origin),
        cached: Some(r#"[{"id":"c1","parentId":null,"name":"From cache"}]"#),
        ..Default::default()
    })
    .await;

    let (_, roots) = fixture.get("/api/roots").await;
    assert_eq!(names(&roots), vec!["From origin"]);
}

#[tokio::test]
async fn test_cache_used_when_origin_unavailable() {
    let fixture = TestFixture::with_options(FixtureOptions {
        origin: Some(FakeOrigin::default()),
        cached: Some(r#"[{"id":"c1","parentId":null,"name":"From cache"}]"#),
        ..Default::default()
    })
    .await;

    let (_, roots) = fixture.get("/api/roots").await;
    assert_eq!(names(&roots), vec!["From cache"]);
}

#[tokio::test]
async fn test_login_required_when_credentials_configured() {
    let origin = FakeOrigin::default();
    origin
        .set_credentials(json!({"username": "ana", "password": "pw"}))
        .await;
    let fixture = TestFixture::with_options(FixtureOptions {
        origin: Some(origin),
        require_login: true,
        ..Default::default()
    })
    .await;

    let (status, body) = fixture.get("/api/nodes").await;
    assert_eq!(status, 401);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = fixture
        .post("/api/session", json!({"username": "ana", "password": "wrong"}))
        .await;
    assert_eq!(status, 401);

    let (status, body) = fixture
        .post("/api/session", json!({"username": "ana", "password": "pw"}))
        .await;
    assert_eq!(status, 200);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["idleTimeoutSecs"], 60);

    let resp = fixture
        .client
        .get(fixture.url("/api/nodes"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .delete(fixture.url("/api/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url("/api/nodes"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_push_and_pull_through_remote() {
    let api = FakeContentsApi::default();
    let fixture = TestFixture::with_options(FixtureOptions {
        contents: Some(api.clone()),
        ..Default::default()
    })
    .await;
    // Let the background push of the sample tree settle
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (status, body) = fixture.post("/api/sync/push", json!({})).await;
    assert_eq!(status, 200);
    assert!(body["data"]["remoteRevision"].as_str().is_some());
    let pushed: Value = serde_json::from_str(&api.file(DOCUMENT_FILE_NAME).await.unwrap()).unwrap();
    assert_eq!(pushed.as_array().unwrap().len(), 3);

    api.seed_file(
        DOCUMENT_FILE_NAME,
        r#"[{"id":"p1","parentId":null,"name":"Pulled"}]"#,
    )
    .await;
    let (status, body) = fixture.post("/api/sync/pull", json!({})).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["nodeCount"], 1);
    let (_, roots) = fixture.get("/api/roots").await;
    assert_eq!(names(&roots), vec!["Pulled"]);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // A concurrent external change surfaces as a remote error
    api.reject_next_put(409, "sha does not match").await;
    let (status, body) = fixture.post("/api/sync/push", json!({})).await;
    assert_eq!(status, 502);
    assert_eq!(body["error"]["code"], "REMOTE_ERROR");
    assert_eq!(body["error"]["details"]["status"], 409);
}

#[tokio::test]
async fn test_sync_without_remote_is_not_configured() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.post("/api/sync/push", json!({})).await;
    assert_eq!(status, 412);
    assert_eq!(body["error"]["code"], "NOT_CONFIGURED");

    let (status, _) = fixture.post("/api/sync/pull", json!({})).await;
    assert_eq!(status, 412);

    let (_, status_body) = fixture.get("/api/status").await;
    assert_eq!(status_body["data"]["remoteConfigured"], false);
    assert_eq!(status_body["data"]["nodeCount"], 3);
    assert_eq!(status_body["data"]["message"]["text"], "Saved locally");
}

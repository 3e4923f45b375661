//! Integration tests for the bookshelf backend.

use std::sync::Arc;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let app = create_router(AppState { repo });

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    /// Import the Science > Physics > Quantum tree and return the topic ids.
    async fn import_science(&self) -> (i64, i64, i64) {
        let (status, body) = self
            .post_json(
                "/api/topics/import",
                json!({
                    "name": "Science",
                    "children": [{ "name": "Physics", "children": [{ "name": "Quantum" }] }]
                }),
            )
            .await;
        assert_eq!(status, 200);
        let root_id = body["data"]["rootId"].as_i64().unwrap();

        let (_, list) = self.get_json("/api/topics").await;
        let id_of = |name: &str| {
            list["data"]
                .as_array()
                .unwrap()
                .iter()
                .find(|t| t["name"] == name)
                .and_then(|t| t["id"].as_i64())
                .unwrap()
        };
        (root_id, id_of("Physics"), id_of("Quantum"))
    }
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
async fn test_revision() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/revision").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let initial = body["data"]["revisionId"].as_i64().unwrap();

    fixture.import_science().await;

    let (_, body) = fixture.get_json("/api/revision").await;
    assert!(body["data"]["revisionId"].as_i64().unwrap() > initial);
}

#[tokio::test]
async fn test_import_and_book_paths() {
    let fixture = TestFixture::new().await;
    let (root_id, physics_id, quantum_id) = fixture.import_science().await;

    let (status, body) = fixture.get_json(&format!("/api/topics/{}", root_id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["kind"], "root");
    assert_eq!(body["data"]["level"], 0);

    let (_, body) = fixture
        .get_json(&format!("/api/topics/{}", quantum_id))
        .await;
    assert_eq!(body["data"]["kind"], "child");
    assert_eq!(body["data"]["parentId"], physics_id);
    assert_eq!(body["data"]["level"], 2);

    let (_, body) = fixture
        .get_json(&format!("/api/topics/{}/ancestors", quantum_id))
        .await;
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Science", "Physics", "Quantum"]);
    assert_eq!(body["data"][0]["kind"], "root");
    assert_eq!(body["data"][0]["level"], 0);

    let (status, _) = fixture
        .post_json("/api/books/42/topics", json!({ "topicId": quantum_id }))
        .await;
    assert_eq!(status, 200);

    let (status, body) = fixture.get_json("/api/books/42/topics/paths").await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        json!([{ "topicId": quantum_id, "path": "Science > Physics > Quantum", "depth": 2 }])
    );

    let (_, body) = fixture.get_json("/api/books/42/topics/tree").await;
    let forest = body["data"].as_array().unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0]["id"], root_id);
    assert_eq!(forest[0]["children"][0]["name"], "Physics");
    assert_eq!(forest[0]["children"][0]["children"][0]["id"], quantum_id);

    let (_, body) = fixture.get_json("/api/books/42/topics").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_flat_tag_flow() {
    let fixture = TestFixture::new().await;
    fixture.import_science().await;

    let (status, body) = fixture
        .post_json("/api/topics", json!({ "name": "  Favorite<EOL> " }))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Favorite");
    assert_eq!(body["data"]["kind"], "flatTag");
    let favorite_id = body["data"]["id"].as_i64().unwrap();

    fixture
        .post_json("/api/books/42/topics", json!({ "topicId": favorite_id }))
        .await;

    let (_, body) = fixture.get_json("/api/books/42/tags").await;
    assert_eq!(body["data"][0]["id"], favorite_id);

    let (_, body) = fixture.get_json("/api/books/42/topics").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = fixture.get_json("/api/books/42/topics/paths").await;
    assert!(body["data"].as_array().unwrap().is_empty());

    // Unassign
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/books/42/topics/{}", favorite_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (_, body) = fixture.get_json("/api/books/42/tags").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_import_validation_error() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/topics/import", json!({ "title": "  <EOL> ", "children": [] }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_import_rolled_back() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json(
            "/api/topics/import",
            json!({ "name": "Science", "children": [{ "name": "Physics" }, { "name": "   " }] }),
        )
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["error"]["code"], "TRANSACTION_FAILURE");

    let (_, body) = fixture.get_json("/api/topics").await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_topic_update_and_delete() {
    let fixture = TestFixture::new().await;
    let (root_id, physics_id, quantum_id) = fixture.import_science().await;

    // Rename
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/topics/{}", physics_id)))
        .json(&json!({ "name": "Applied  Physics", "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Applied Physics");
    assert_eq!(body["data"]["version"], 2);

    // Stale version
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/topics/{}", physics_id)))
        .json(&json!({ "name": "Should Fail", "expectedVersion": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VERSION_MISMATCH");
    assert_eq!(body["error"]["details"]["currentVersion"], 2);

    // Structural level change
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/topics/{}", quantum_id)))
        .json(&json!({ "level": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Delete
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/topics/{}", root_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (status, body) = fixture.get_json(&format!("/api/topics/{}", root_id)).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // Children survive the delete; the chain now stops below the root
    let (_, body) = fixture
        .get_json(&format!("/api/topics/{}/ancestors", quantum_id))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_assign_unknown_topic() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/books/7/topics", json!({ "topicId": 12345 }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ancestors_unknown_topic() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/topics/999/ancestors").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
}

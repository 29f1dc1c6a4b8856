//! Common test utilities for in-process API testing.
//!
//! This module provides a test fixture that builds the full router over a
//! SQLite database in a temporary directory, so tests exercise the same
//! store, transactions and handlers as the binary.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use bookshelf_core::{Config, DatabaseConfig, ServerConfig, SimilarityConfig, SqliteLibrary};
use bookshelf_server::state::AppState;

/// Re-export fixtures for test convenience
pub use bookshelf_core::testing::fixtures;

/// Test fixture for API testing.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_genre_creation() {
///     let fixture = TestFixture::new();
///
///     let response = fixture.post("/api/v1/genres", json!({ "name": "Poetry" })).await;
///
///     assert_eq!(response.status, StatusCode::CREATED);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Temporary directory holding the test database
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default similarity settings.
    pub fn new() -> Self {
        Self::with_similarity(SimilarityConfig::default())
    }

    /// Create a test fixture with custom similarity settings.
    pub fn with_similarity(similarity: SimilarityConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            similarity,
        };

        let store = SqliteLibrary::new(&db_path).expect("Failed to create library store");
        let state = Arc::new(AppState::new(config, store));
        let router = bookshelf_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            temp_dir,
        }
    }

    /// Create a genre and return its id.
    pub async fn create_genre(&self, name: &str) -> i64 {
        let response = self.post("/api/v1/genres", json!({ "name": name })).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().expect("genre id")
    }

    /// Create a book with a unique ISBN and return its id.
    pub async fn create_book(&self, title: &str, genre_id: i64) -> i64 {
        let book = fixtures::new_book(title, genre_id);
        let response = self
            .post("/api/v1/books", serde_json::to_value(&book).unwrap())
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body["id"].as_i64().expect("book id")
    }

    /// Ids of the books similar to `book_id`.
    pub async fn similar_ids(&self, book_id: i64) -> Vec<i64> {
        let response = self
            .get(&format!("/api/v1/books/{}/similar", book_id))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["similar"]
            .as_array()
            .expect("similar array")
            .iter()
            .filter_map(|book| book["id"].as_i64())
            .collect()
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a PUT request with JSON body.
    pub async fn put(&self, path: &str, body: Value) -> TestResponse {
        self.request("PUT", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Fetch a non-JSON body as text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}

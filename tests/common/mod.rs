//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use http_driver::config::DriverConfig;

/// How long `/slow` takes to answer.
pub const SLOW_DELAY: Duration = Duration::from_millis(400);

#[derive(Clone, Default)]
struct Counters {
    hits: Arc<AtomicU32>,
}

/// A running test backend.
pub struct TestBackend {
    pub addr: SocketAddr,
    counters: Counters,
}

impl TestBackend {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Requests received so far, on any route.
    pub fn hits(&self) -> u32 {
        self.counters.hits.load(Ordering::SeqCst)
    }
}

/// Start the backend on an ephemeral port.
pub async fn start_test_backend() -> TestBackend {
    let counters = Counters::default();
    let app = Router::new()
        .route("/hello", get(|| async { "Hello World" }))
        .route("/pet", post(add_pet))
        .route("/querystring", get(echo_query))
        .route("/delete", delete(|| async { Json(json!({"deleted": true})) }))
        .route("/error", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }))
        .route("/slow", get(slow))
        .route("/headers", get(echo_headers))
        .route("/upload", post(upload))
        .route("/redirect", get(|| async { Redirect::temporary("/hello") }))
        .layer(middleware::from_fn_with_state(counters.clone(), count_hits));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestBackend { addr, counters }
}

/// Driver configuration for tests: no system proxy, short timeouts.
pub fn test_config(eager: bool) -> DriverConfig {
    let mut config = DriverConfig::default();
    config.eager = eager;
    config.transport.no_proxy = true;
    config.transport.connect_timeout_secs = 2;
    config
}

async fn count_hits(State(counters): State<Counters>, request: Request, next: Next) -> Response {
    counters.hits.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn add_pet(Json(pet): Json<Value>) -> String {
    format!(
        "added {} the {}",
        pet["name"].as_str().unwrap_or_default(),
        pet["species"].as_str().unwrap_or_default()
    )
}

async fn echo_query(Query(params): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(params)
}

async fn echo_headers(headers: HeaderMap) -> impl IntoResponse {
    let pick = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "authorization": pick("authorization"),
        "accept": pick("accept"),
        "content-type": pick("content-type"),
        "x-custom": pick("x-custom"),
        "user-agent": pick("user-agent"),
    }))
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "finally"
}

async fn upload(mut multipart: Multipart) -> Json<Vec<Value>> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let text = field.text().await.unwrap();
        parts.push(json!({"name": name, "filename": filename, "text": text}));
    }
    Json(parts)
}

// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /rates, GET /taux
// - POST /rates/refresh (partial success, store fault)

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value as Json;
use shuttle_axum::axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use tower::ServiceExt as _; // for `oneshot`

use rate_aggregator::api::{self, AppState};
use rate_aggregator::ingest::providers::ria::RiaExtractor;
use rate_aggregator::ingest::types::ScrapeOutcome;
use rate_aggregator::store::MemoryRateStore;
use rate_aggregator::{RateEngine, RateExtractor, RateRecord, RateStore, ScrapeFailure};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests
const RIA_PAGE: &str = include_str!("fixtures/ria.html");

struct DownExtractor;

#[async_trait]
impl RateExtractor for DownExtractor {
    fn source(&self) -> &str {
        "Gandyam Pay"
    }
    async fn extract(&self) -> ScrapeOutcome {
        Err(ScrapeFailure::Transport("dns".into()))
    }
}

struct ReadOnlyStore;

#[async_trait]
impl RateStore for ReadOnlyStore {
    async fn find_all(&self) -> Result<Vec<RateRecord>> {
        bail!("database is locked")
    }
    async fn upsert(&self, _source: &str, _value: &str) -> Result<RateRecord> {
        bail!("attempt to write a readonly database")
    }
}

fn test_router(store: Arc<dyn RateStore>) -> Router {
    let extractors: Vec<Arc<dyn RateExtractor>> = vec![
        Arc::new(RiaExtractor::from_fixture(RIA_PAGE)),
        Arc::new(DownExtractor),
    ];
    let engine = RateEngine::new(store, extractors, Duration::from_secs(5));
    api::router(AppState::new(engine))
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router(Arc::new(MemoryRateStore::new()));
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(String::from_utf8(bytes.to_vec()).unwrap().trim(), "OK");
}

#[tokio::test]
async fn api_refresh_reports_updated_and_failed_sources() {
    let store = Arc::new(MemoryRateStore::new());
    let app = test_router(store.clone());

    let (status, v) = send(app.clone(), "POST", "/rates/refresh").await;
    assert_eq!(status, StatusCode::OK, "partial success is still a 200");
    assert_eq!(v["updated"], serde_json::json!(["Ria Money Transfer"]));
    assert_eq!(v["failed"][0]["source"], "Gandyam Pay");
    assert_eq!(v["failed"][0]["reason"], "transport");

    let (status, rows) = send(app, "GET", "/rates").await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().expect("array of records");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["source"], "Ria Money Transfer");
    assert_eq!(rows[0]["value"], "65 595,70");
    assert!(rows[0].get("observedAt").is_some(), "missing 'observedAt'");
}

#[tokio::test]
async fn api_legacy_paths_are_served() {
    let app = test_router(Arc::new(MemoryRateStore::new()));

    let (status, _) = send(app.clone(), "POST", "/taux/refresh").await;
    assert_eq!(status, StatusCode::OK);
    let (status, rows) = send(app, "GET", "/taux").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn api_store_faults_become_generic_500() {
    let app = test_router(Arc::new(ReadOnlyStore));

    let (status, v) = send(app.clone(), "POST", "/rates/refresh").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["message"], "Failed to update rates.");

    let (status, v) = send(app, "GET", "/rates").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v["message"], "Failed to load rates.");
}

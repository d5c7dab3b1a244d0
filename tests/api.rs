//! Integration tests for the `/van-don` HTTP API
//!
//! Drives the router in-process with a scripted upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vandon::cache::CacheCell;
use vandon::data::{Record, RowSource, SheetError};
use vandon::proxy::VanDonProxy;
use vandon::server::{router, AppState};

/// Upstream that always returns the same rows, or always fails
#[derive(Clone)]
struct FakeSheet {
    rows: Option<Vec<Record>>,
    calls: Arc<AtomicUsize>,
}

impl FakeSheet {
    fn ok(rows: Vec<Record>) -> Self {
        Self {
            rows: Some(rows),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            rows: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl RowSource for FakeSheet {
    async fn fetch_rows(&self) -> Result<Vec<Record>, SheetError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rows
            .clone()
            .ok_or_else(|| SheetError::Upstream("sheet offline".to_string()))
    }
}

fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map,
        _ => panic!("test rows must be objects"),
    }
}

fn team_rows(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let team = if i % 2 == 0 { "HCM" } else { "Hà Nội" };
            record(json!({ "Mã đơn hàng": format!("VD-{:04}", i), "Team": team }))
        })
        .collect()
}

fn app(sheet: FakeSheet, mock_fallback: bool) -> Router {
    let proxy = VanDonProxy::new(sheet, CacheCell::new(Duration::from_secs(60)))
        .with_mock_fallback(mock_fallback);
    router(Arc::new(AppState::new(proxy)))
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "https://dashboard.example.com")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, headers, body)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, _, body) = send(app, Method::GET, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_returns_first_page_with_metadata() {
    let sheet = FakeSheet::ok(team_rows(250));
    let app = app(sheet, true);

    let (status, body) = get_json(&app, "/api/van-don").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 250);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["totalPages"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 100);
    assert_eq!(body["rows"], body["data"]);
    assert_eq!(body["cached"], false);
    assert_eq!(body["source"], "network");
}

#[tokio::test]
async fn test_third_page_holds_last_fifty_rows() {
    let app = app(FakeSheet::ok(team_rows(250)), true);

    let (_, body) = get_json(&app, "/api/van-don?page=3&limit=100").await;

    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 50);
    assert_eq!(data[0]["Mã đơn hàng"], "VD-0200");
    assert_eq!(data[49]["Mã đơn hàng"], "VD-0249");
    assert_eq!(body["totalPages"], 3);
}

#[tokio::test]
async fn test_team_filter_and_all_sentinel() {
    let app = app(FakeSheet::ok(team_rows(10)), true);

    let (_, body) = get_json(&app, "/van-don?team=HCM").await;
    assert_eq!(body["total"], 5);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|row| row["Team"] == "HCM"));

    let (_, body) = get_json(&app, "/van-don?team=all").await;
    assert_eq!(body["total"], 10);
}

#[tokio::test]
async fn test_second_request_is_served_from_cache() {
    let sheet = FakeSheet::ok(team_rows(3));
    let calls = Arc::clone(&sheet.calls);
    let app = app(sheet, true);

    get_json(&app, "/api/van-don").await;
    let (_, body) = get_json(&app, "/van-don").await;

    assert_eq!(body["cached"], true);
    assert_eq!(body["source"], "cache");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failing_upstream_serves_mock_rows() {
    let app = app(FakeSheet::failing(), true);

    let (status, body) = get_json(&app, "/api/van-don").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 2);
    assert_eq!(body["source"], "mock");
    assert_eq!(body["cached"], false);
}

#[tokio::test]
async fn test_failing_upstream_without_mock_is_500() {
    let app = app(FakeSheet::failing(), false);

    let (status, body) = get_json(&app, "/api/van-don").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("sheet offline"));
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_options_returns_empty_200() {
    let app = app(FakeSheet::ok(team_rows(1)), true);

    let (status, _, body) = send(&app, Method::OPTIONS, "/api/van-don").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.is_empty());
}

#[tokio::test]
async fn test_non_get_is_405() {
    let app = app(FakeSheet::ok(team_rows(1)), true);

    let (status, _, body) = send(&app, Method::POST, "/api/van-don").await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let app = app(FakeSheet::ok(team_rows(1)), true);

    let (_, headers, _) = send(&app, Method::GET, "/api/van-don").await;

    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_health_reports_cache_state() {
    let app = app(FakeSheet::ok(team_rows(1)), true);

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["cachedAt"].is_null());

    get_json(&app, "/api/van-don").await;
    let (_, body) = get_json(&app, "/health").await;
    assert!(body["cachedAt"].is_string());
    assert_eq!(body["cacheExpired"], false);
}

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::NaiveDate;
use cyber_reporter::{
    server::{create_router, AppState},
    store::ReportStore,
    types::{RankedAttack, Report},
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn report_with_attack(report_date: NaiveDate) -> Report {
    Report {
        date: report_date,
        ranked_attacks: vec![RankedAttack {
            rank: 1,
            title: "Botnet hijacks edge routers".to_string(),
            source: "Example Security News".to_string(),
            link: "https://example.com/botnet".to_string(),
            summary: "Tens of thousands of devices conscripted.".to_string(),
        }],
        lessons: Vec::new(),
    }
}

fn router_over(dir: &TempDir) -> (axum::Router, Arc<ReportStore>) {
    let store = Arc::new(ReportStore::open(dir.path()).unwrap());
    let router = create_router(AppState {
        store: store.clone(),
    });
    (router, store)
}

async fn get_json(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();
    (status, value)
}

#[tokio::test]
async fn health_endpoint_responds() {
    let dir = TempDir::new().unwrap();
    let (router, _store) = router_over(&dir);

    let (status, body) = get_json(router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["healthy"], true);
}

#[tokio::test]
async fn list_reports_is_descending_and_excludes_latest_alias() {
    let dir = TempDir::new().unwrap();
    let (router, store) = router_over(&dir);

    for day in [date(2024, 1, 2), date(2024, 2, 1)] {
        store.put(&report_with_attack(day)).unwrap();
    }
    assert!(dir.path().join("latest.json").exists());

    let (status, body) = get_json(router, "/reports").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({ "reports": ["2024-02-01", "2024-01-02"] })
    );
}

#[tokio::test]
async fn get_report_returns_stored_json() {
    let dir = TempDir::new().unwrap();
    let (router, store) = router_over(&dir);
    let report = report_with_attack(date(2024, 2, 1));
    store.put(&report).unwrap();

    let (status, body) = get_json(router, "/reports/2024-02-01").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["date"], "2024-02-01");
    assert_eq!(body["ranked_attacks"][0]["rank"], 1);
    assert_eq!(body["lessons"], serde_json::json!([]));
}

#[tokio::test]
async fn get_missing_report_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (router, _store) = router_over(&dir);

    let (status, body) = get_json(router, "/reports/2024-01-02").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn get_with_invalid_date_is_not_found() {
    let dir = TempDir::new().unwrap();
    let (router, _store) = router_over(&dir);

    let (status, _body) = get_json(router, "/reports/latest").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_corrupt_report_is_server_error() {
    let dir = TempDir::new().unwrap();
    let (router, store) = router_over(&dir);
    store.put(&report_with_attack(date(2024, 1, 1))).unwrap();

    fs::write(dir.path().join("2024-01-01.json"), "{\"date\": \"2024-01").unwrap();

    let (status, body) = get_json(router, "/reports/2024-01-01").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].is_string());
}

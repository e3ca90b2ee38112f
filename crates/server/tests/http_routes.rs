use std::fs;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use cohort_core::config::AppConfig;
use cohort_server::{router, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const INVOICES: &str = "\
Fatura,Cari,Ad,Tarih,Urun,Kg,Tutar
F01,C1,Acme Boya,2024-01-05,Boya,1,100
F01,C1,Acme Boya,2024-01-05,Tiner,1,20
F02,C1,Acme Boya,2024-02-10,Boya,1,50
F03,C2,Beta Yapi,2023-06-01,Astar,1,900
F04,C3,Gama Insaat,2024-03-01,Boya,1,20
F05,C3,Gama Insaat,2024-03-02,Boya,1,20
F06,C3,Gama Insaat,2024-03-03,Boya,1,20
F07,C4,Delta Boya,2023-01-01,Vernik,1,5
F08,C5,Epsilon,2024-03-09,Boya,1,300
F09,C5,Epsilon,2023-11-09,Boya,1,300
";

const RECOMMENDATIONS: &str = "\
UrunAdi,OnerilenUrunAdi
Rakip Boya,Denge Boya
Rakip Boya,Denge Astar
Rakip Vernik,Denge Vernik
";

fn fixture() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    fs::write(dir.path().join("invoices.csv"), INVOICES).expect("invoice fixture");
    fs::write(dir.path().join("recommendations.csv"), RECOMMENDATIONS)
        .expect("recommendation fixture");

    let mut config = AppConfig::default();
    config.data.invoices_path = dir.path().join("invoices.csv");
    config.data.recommendations_path = dir.path().join("recommendations.csv");

    let state = AppState::load(config).expect("fixture should score");
    (dir, state)
}

async fn send(app: &Router, method: Method, uri: &str) -> (StatusCode, Value) {
    let request =
        Request::builder().method(method).uri(uri).body(Body::empty()).expect("valid request");
    let response = app.clone().oneshot(request).await.expect("router should respond");
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024).await.expect("body should read");
    let json = serde_json::from_slice(&body).expect("body should be json");
    (status, json)
}

#[tokio::test]
async fn health_reports_snapshot_stats() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["snapshot"]["stats"]["invoices"], 9);
    assert_eq!(body["snapshot"]["stats"]["customers"], 5);
    assert_eq!(body["snapshot"]["reference_date"], "2024-03-10");
}

#[tokio::test]
async fn segments_match_name_substring_ignoring_case() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/segments?name=BOYA").await;

    assert_eq!(status, StatusCode::OK);
    let matches = body["matches"].as_array().expect("matches list");
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[1]["customer_name"], "Delta Boya");
    assert_eq!(matches[1]["rfm_segment"], "hibernating");
    assert_eq!(matches[1]["cltv_tier"], "D");
}

#[tokio::test]
async fn segments_without_match_return_empty_list() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/segments?name=zeta").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["matches"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn segments_require_a_name() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/segments").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_class"], "invalid_query");
    assert!(body["correlation_id"].as_str().unwrap_or("").starts_with("req-"));
}

#[tokio::test]
async fn monthly_series_has_twelve_months() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) =
        send(&app, Method::GET, "/customers/monthly?name=Acme%20Boya&year=2024").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    let months = body["months"].as_array().expect("months list");
    assert_eq!(months.len(), 12);
    assert_eq!(months[0]["month"], 1);
    assert_eq!(months[0]["purchases"], 1);
    assert_eq!(months[1]["purchases"], 1);
    assert_eq!(months[11]["purchases"], 0);
}

#[tokio::test]
async fn monthly_rejects_non_numeric_year() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/customers/monthly?name=Acme&year=soon").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap_or("").contains("soon"));
}

#[tokio::test]
async fn names_list_customers_and_years() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (status, body) = send(&app, Method::GET, "/customers/names").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["names"].as_array().map(Vec::len), Some(5));
    assert_eq!(body["years"], serde_json::json!([2024, 2023]));
}

#[tokio::test]
async fn recommendations_filter_or_return_whole_table() {
    let (_dir, state) = fixture();
    let app = router(state);

    let (_, filtered) = send(&app, Method::GET, "/recommendations?product=vernik").await;
    assert_eq!(filtered["groups"].as_array().map(Vec::len), Some(1));
    assert_eq!(filtered["groups"][0]["recommended"][0], "Denge Vernik");

    let (_, unknown) = send(&app, Method::GET, "/recommendations?product=nothing").await;
    assert_eq!(unknown["groups"], Value::Array(Vec::new()));

    let (_, whole) = send(&app, Method::GET, "/recommendations").await;
    assert!(whole["product"].is_null());
    assert_eq!(whole["groups"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn reload_swaps_in_the_new_snapshot() {
    let (dir, state) = fixture();
    let app = router(state);
    let extended = format!("{INVOICES}F10,C6,Zeta Boya,2024-03-05,Boya,1,75\n");
    fs::write(dir.path().join("invoices.csv"), extended).expect("rewrite invoices");

    let (status, body) = send(&app, Method::POST, "/reload").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "reloaded");
    assert_eq!(body["stats"]["customers"], 6);

    let (_, segments) = send(&app, Method::GET, "/segments?name=zeta").await;
    assert_eq!(segments["matches"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn failed_reload_keeps_serving_the_previous_snapshot() {
    let (dir, state) = fixture();
    let app = router(state);
    fs::write(dir.path().join("invoices.csv"), "Fatura,Cari\nF01,C1\n").expect("break invoices");

    let (status, body) = send(&app, Method::POST, "/reload").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error_class"], "source_load");

    let (status, names) = send(&app, Method::GET, "/customers/names").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names["names"].as_array().map(Vec::len), Some(5));
}

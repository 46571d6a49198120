//! Route tests: the full router driven with `oneshot`, a real drift model in
//! a temp artifact dir, and in-memory exchange and quote providers.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, NaiveDate};
use klinefeed_core::config::AppConfig;
use klinefeed_core::data::{DataError, ExchangeClient, KlineQuery, QuoteProvider, RawKline};
use klinefeed_core::domain::{OhlcvRow, OhlcvTable};
use klinefeed_core::model::create_model;
use klinefeed_server::{app_router, AppState};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

const DAY_MS: i64 = 86_400_000;

/// Daily klines for whatever window is asked, closes rising by 1 per day.
struct DailyExchange {
    serve_rows: bool,
}

impl ExchangeClient for DailyExchange {
    fn name(&self) -> &str {
        "daily"
    }

    fn list_symbols(&self) -> Result<BTreeSet<String>, DataError> {
        Ok(["ETHUSDT".to_string()].into_iter().collect())
    }

    fn fetch_page(&self, query: &KlineQuery) -> Result<Vec<RawKline>, DataError> {
        if !self.serve_rows {
            return Ok(Vec::new());
        }
        let (start, end) = (query.start_ms.unwrap_or(0), query.end_ms.unwrap_or(0));
        let mut page = Vec::new();
        let mut open_time = start;
        while open_time < end {
            let price = 100.0 + (open_time / DAY_MS % 1000) as f64;
            page.push(RawKline {
                open_time,
                open: price.to_string(),
                high: price.to_string(),
                low: price.to_string(),
                close: price.to_string(),
                volume: "1".into(),
                close_time: open_time + DAY_MS - 1,
                quote_asset_volume: "0".into(),
                number_of_trades: 1,
                taker_buy_base_volume: "0".into(),
                taker_buy_quote_volume: "0".into(),
            });
            open_time += DAY_MS;
        }
        Ok(page)
    }
}

struct FixedQuotes {
    table: Option<OhlcvTable>,
}

impl QuoteProvider for FixedQuotes {
    fn name(&self) -> &str {
        "fixed"
    }

    fn fetch_daily(
        &self,
        ticker: &str,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<OhlcvTable, DataError> {
        self.table.clone().ok_or_else(|| DataError::SymbolNotFound {
            symbol: ticker.to_string(),
        })
    }
}

struct Harness {
    dir: TempDir,
    app: axum::Router,
}

fn harness(serve_rows: bool, quotes: Option<OhlcvTable>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.model.artifact_dir = dir.path().join("models");
    config.fetch.cache_dir = dir.path().join("sets");
    config.fetch.page_delay_ms = 0;
    config.fetch.symbol_delay_ms = 0;

    let model = create_model(&config.model).unwrap();
    let state = AppState::new(
        config,
        model,
        Arc::new(DailyExchange { serve_rows }),
        Arc::new(FixedQuotes { table: quotes }),
    );
    Harness {
        dir,
        app: app_router(state),
    }
}

async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn with_payload(path: &str, payload: &Value) -> String {
    format!(
        "{path}?payload={}",
        urlencoding::encode(&payload.to_string())
    )
}

fn training_payload() -> Value {
    json!({
        "data": {
            "date": ["2024-09-06", "2024-09-07", "2024-09-08"],
            "open": [100.0, 110.0, 121.0],
            "high": [100.0, 110.0, 121.0],
            "low": [100.0, 110.0, 121.0],
            "close": [100.0, 110.0, 121.0],
            "volume": [1000000, 2000000, 3000000]
        }
    })
}

fn inference_payload() -> Value {
    json!({
        "topic_id": 1,
        "data": {
            "date": ["2024-09-06", "2024-09-07"],
            "open": [2400, 2700],
            "high": [2500, 2800],
            "low": [1500, 1900],
            "close": [200.0, 300.0],
            "volume": [1000000, 2000000]
        }
    })
}

fn quote_table() -> OhlcvTable {
    OhlcvTable::new(
        [1000.0, 2000.0]
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvRow {
                date: DateTime::from_timestamp_millis(i as i64 * DAY_MS).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1.0,
            })
            .collect(),
    )
}

// ── Health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_active_model() {
    let h = harness(true, None);
    let (status, body) = get(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "model": "drift"}));
}

// ── /getinference/ validation ────────────────────────────────────────

#[tokio::test]
async fn missing_topic_id_is_rejected() {
    let h = harness(true, None);
    let mut payload = inference_payload();
    payload.as_object_mut().unwrap().remove("topic_id");

    let (status, body) = get(&h.app, &with_payload("/getinference/", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Topic ID is required in the payload.");
}

#[tokio::test]
async fn empty_topic_id_is_rejected() {
    let h = harness(true, None);
    let mut payload = inference_payload();
    payload["topic_id"] = json!("");

    let (status, body) = get(&h.app, &with_payload("/getinference/", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Topic ID is required in the payload.");
}

#[tokio::test]
async fn missing_data_is_rejected() {
    let h = harness(true, None);
    let payload = json!({"topic_id": 1});

    let (status, body) = get(&h.app, &with_payload("/getinference/", &payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Input data is required in the payload.");
}

#[tokio::test]
async fn invalid_json_is_rejected() {
    let h = harness(true, None);
    let uri = format!("/getinference/?payload={}", urlencoding::encode("{topic_id: 1"));

    let (status, body) = get(&h.app, &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid JSON payload for Get Inference.");
}

#[tokio::test]
async fn absent_payload_is_rejected() {
    let h = harness(true, None);
    let (status, body) = get(&h.app, "/getinference/").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Invalid JSON payload for Get Inference.");
}

#[tokio::test]
async fn untrained_model_is_not_found() {
    let h = harness(true, None);
    let (status, body) = get(&h.app, &with_payload("/getinference/", &inference_payload())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].as_str().unwrap().contains("drift.json"));
}

// ── Training then inference ──────────────────────────────────────────

#[tokio::test]
async fn train_from_payload_then_get_inference() {
    let h = harness(true, None);

    let (status, body) = get(&h.app, &with_payload("/update-model/", &training_payload())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"training": "Model training and saving complete!"}));
    assert!(h.dir.path().join("models/drift.json").exists());

    let (status, body) = get(&h.app, &with_payload("/getinference/", &inference_payload())).await;
    assert_eq!(status, StatusCode::OK);

    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0]["close"], json!(200.0));
    assert!((predictions[0]["prediction"].as_f64().unwrap() - 220.0).abs() < 1e-9);
    assert!((predictions[1]["prediction"].as_f64().unwrap() - 330.0).abs() < 1e-9);
    assert!(predictions[1].get("date").is_some());
}

#[tokio::test]
async fn training_payload_without_data_is_rejected() {
    let h = harness(true, None);
    let (status, body) = get(&h.app, &with_payload("/update-model/", &json!({"topic_id": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Input data is required in the payload.");
}

#[tokio::test]
async fn train_without_payload_fetches_from_exchange() {
    let h = harness(true, None);

    let (status, _) = get(&h.app, "/update-model/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(h.dir.path().join("models/drift.json").exists());

    let cached: Vec<_> = std::fs::read_dir(h.dir.path().join("sets"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(cached.len(), 1);
    assert!(cached[0].starts_with("ETHUSDT_") && cached[0].ends_with("_1d.parquet"));
}

#[tokio::test]
async fn train_without_any_rows_is_internal_error() {
    let h = harness(false, None);
    let (status, body) = get(&h.app, "/update-model/").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().starts_with("Training error"));
}

// ── /inference ───────────────────────────────────────────────────────

#[tokio::test]
async fn latest_inference_returns_bare_number() {
    let h = harness(true, Some(quote_table()));
    get(&h.app, &with_payload("/update-model/", &training_payload())).await;

    let (status, body) = get(&h.app, "/inference").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body.as_f64().unwrap() - 2200.0).abs() < 1e-6);
}

#[tokio::test]
async fn latest_inference_surfaces_quote_failure() {
    let h = harness(true, None);
    get(&h.app, &with_payload("/update-model/", &training_payload())).await;

    let (status, body) = get(&h.app, "/inference").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"].as_str().unwrap().contains("ETH-USD"));
}

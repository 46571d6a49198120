use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use klinefeed_core::data::{ChunkedFetcher, FetchRequest};
use klinefeed_core::domain::OhlcvTable;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{decode_payload, payload_table, PayloadQuery};
use crate::error::ApiError;
use crate::state::AppState;

const CONTEXT: &str = "Training error";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/update-model/", get(update_model))
}

/// GET /update-model/[?payload=]: train and persist the active model.
///
/// With a payload its `data` is the training set; otherwise the configured
/// training symbol is fetched from the exchange.
async fn update_model(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PayloadQuery>,
) -> Result<Json<Value>, ApiError> {
    let supplied = match query.payload {
        Some(raw) => {
            let payload = decode_payload(&raw, "Invalid JSON payload.")?;
            Some(payload_table(&payload)?)
        }
        None => None,
    };

    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        let data = match supplied {
            Some(table) => table,
            None => fetch_training_data(&state)?,
        };
        tracing::info!(rows = data.len(), model = state.model.name(), "training model");
        state
            .model
            .train(&data)
            .map_err(|e| ApiError::from_model(CONTEXT, e))
    })
    .await??;

    Ok(Json(json!({ "training": "Model training and saving complete!" })))
}

/// Fetch the training window through the chunked fetcher with explicit dates.
fn fetch_training_data(state: &AppState) -> Result<OhlcvTable, ApiError> {
    let training = &state.config.training;
    let fetch = &state.config.fetch;

    let end = Utc::now().date_naive();
    let start = end - Duration::days(i64::from(training.lookback_days));
    let request = FetchRequest::new(training.symbol.clone(), training.interval)
        .between(start, end)
        .chunk_span_ms(fetch.chunk_span_ms());

    let fetcher = ChunkedFetcher::new(state.exchange.as_ref(), &state.cache)
        .with_pacing(fetch.pacing())
        .with_range_policy(fetch.default_range)
        .with_page_limit(fetch.page_limit);

    fetcher
        .fetch_range(&request)
        .map_err(|e| ApiError::from_data(CONTEXT, e))
}

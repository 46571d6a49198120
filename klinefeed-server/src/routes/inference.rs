use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{Duration, Utc};
use klinefeed_core::domain::PredictionTable;
use serde::Serialize;
use std::sync::Arc;

use super::{decode_payload, is_present, payload_table, PayloadQuery};
use crate::error::ApiError;
use crate::state::AppState;

const INVALID_PAYLOAD: &str = "Invalid JSON payload for Get Inference.";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/getinference/", get(get_inference))
        .route("/inference", get(latest_inference))
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: PredictionTable,
}

/// GET /getinference/?payload=: predictions for caller-supplied rows.
///
/// Payload: `{"topic_id": ..., "data": {"date": [...], "open": [...], ...}}`.
async fn get_inference(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PayloadQuery>,
) -> Result<Json<PredictionsResponse>, ApiError> {
    let raw = query
        .payload
        .ok_or_else(|| ApiError::MalformedPayload(INVALID_PAYLOAD.into()))?;
    let payload = decode_payload(&raw, INVALID_PAYLOAD)?;

    let topic_id = payload.get("topic_id").filter(|v| is_present(v));
    let Some(topic_id) = topic_id else {
        return Err(ApiError::MalformedPayload(
            "Topic ID is required in the payload.".into(),
        ));
    };
    let table = payload_table(&payload)?;
    tracing::info!(%topic_id, rows = table.len(), "get inference");

    let model = Arc::clone(&state.model);
    let predictions = tokio::task::spawn_blocking(move || {
        model.load()?;
        model.inference(&table)
    })
    .await?
    .map_err(|e| ApiError::from_model("Get Inference error", e))?;

    Ok(Json(PredictionsResponse { predictions }))
}

/// GET /inference: last prediction over the configured ticker's recent
/// daily quotes, as a bare number.
async fn latest_inference(State(state): State<Arc<AppState>>) -> Result<Json<f64>, ApiError> {
    let quote = state.config.quote.clone();
    let end = Utc::now().date_naive();
    let start = end - Duration::days(i64::from(quote.lookback_days));

    let quotes = Arc::clone(&state.quotes);
    let model = Arc::clone(&state.model);
    let prediction = tokio::task::spawn_blocking(move || -> Result<f64, ApiError> {
        let table = quotes
            .fetch_daily(&quote.ticker, start, end)
            .map_err(|e| ApiError::from_data("GetInference error", e))?;
        model
            .load()
            .map_err(|e| ApiError::from_model("GetInference error", e))?;
        let predictions = model
            .inference(&table)
            .map_err(|e| ApiError::from_model("GetInference error", e))?;
        predictions.last_prediction().ok_or_else(|| {
            ApiError::Internal(format!(
                "GetInference error: no quotes for {} since {start}",
                quote.ticker
            ))
        })
    })
    .await??;

    Ok(Json(prediction))
}

pub mod health;
pub mod inference;
pub mod training;

use axum::Router;
use klinefeed_core::domain::{OhlcvColumns, OhlcvTable};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Assemble the API router.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(inference::routes())
        .merge(training::routes())
}

/// `?payload=<url-encoded JSON>`
#[derive(Debug, Deserialize)]
pub struct PayloadQuery {
    pub payload: Option<String>,
}

/// Decode a payload string into a JSON object.
///
/// The query extractor has already percent-decoded once; clients that
/// double-encode are decoded again here.
pub(crate) fn decode_payload(
    raw: &str,
    invalid_msg: &str,
) -> Result<serde_json::Map<String, Value>, ApiError> {
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ApiError::MalformedPayload(invalid_msg.to_string()))?;
    match serde_json::from_str::<Value>(&decoded) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ApiError::MalformedPayload(invalid_msg.to_string())),
    }
}

/// Convert the payload's `data` field into a table. Missing or empty data
/// is rejected.
pub(crate) fn payload_table(
    payload: &serde_json::Map<String, Value>,
) -> Result<OhlcvTable, ApiError> {
    let data = payload
        .get("data")
        .filter(|v| is_present(v))
        .ok_or_else(|| ApiError::MalformedPayload("Input data is required in the payload.".into()))?;

    let columns: OhlcvColumns = serde_json::from_value(data.clone())
        .map_err(|e| ApiError::MalformedPayload(format!("Input data is malformed: {e}")))?;
    OhlcvTable::from_columns(columns)
        .map_err(|e| ApiError::MalformedPayload(format!("Input data is malformed: {e}")))
}

/// False for null, `false`, zero, and empty strings, arrays and objects.
pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

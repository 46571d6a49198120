//! HTTP error type. Every failure renders as `{"detail": message}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use klinefeed_core::data::DataError;
use klinefeed_core::model::ModelError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    MalformedPayload(String),

    #[error("{0}")]
    ModelArtifactMissing(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            Self::ModelArtifactMissing(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a model failure; `context` prefixes 500 messages.
    pub fn from_model(context: &str, err: ModelError) -> Self {
        match err {
            ModelError::ArtifactMissing { .. } => Self::ModelArtifactMissing(err.to_string()),
            other => Self::Internal(format!("{context}: {other}")),
        }
    }

    /// Map a data pipeline failure; `context` prefixes 500 messages.
    pub fn from_data(context: &str, err: DataError) -> Self {
        Self::Internal(format!("{context}: {err}"))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(format!("worker task failed: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, axum::Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

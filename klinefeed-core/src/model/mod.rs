//! Predictive model capability.
//!
//! The HTTP layer only sees [`Model`]: `load`, `train`, `inference`. Concrete
//! models are built by name with [`create_model`] once at startup and shared
//! behind an `Arc`.

pub mod drift;

use crate::config::ModelConfig;
use crate::domain::{OhlcvTable, PredictionTable};
use std::path::PathBuf;
use std::sync::Arc;

pub use drift::DriftModel;

/// Errors raised by model implementations.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("model '{0}' has not been loaded or trained")]
    NotLoaded(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("unknown model: {0}")]
    UnknownModel(String),

    #[error("model I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A trainable predictor over OHLCV tables.
///
/// Methods take `&self`; implementations keep their fitted state behind
/// interior mutability so one instance can serve concurrent requests.
pub trait Model: Send + Sync {
    /// Registry name of the model.
    fn name(&self) -> &str;

    /// Load fitted parameters from the model's artifact.
    fn load(&self) -> Result<(), ModelError>;

    /// Fit on `data` and persist the artifact.
    fn train(&self, data: &OhlcvTable) -> Result<(), ModelError>;

    /// Predict for every row of `data`.
    fn inference(&self, data: &OhlcvTable) -> Result<PredictionTable, ModelError>;
}

/// Names accepted by [`create_model`].
pub const MODEL_NAMES: [&str; 1] = [DriftModel::NAME];

/// Build the model named in `config.active`.
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn Model>, ModelError> {
    match config.active.as_str() {
        DriftModel::NAME => Ok(Arc::new(DriftModel::new(&config.artifact_dir))),
        other => Err(ModelError::UnknownModel(other.to_string())),
    }
}

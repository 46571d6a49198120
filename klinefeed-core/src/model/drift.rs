//! Drift model: baseline log-return extrapolation.
//!
//! Training fits the mean close-to-close log return. Inference predicts the
//! next close as `close * e^drift` for every row.

use super::{Model, ModelError};
use crate::domain::{OhlcvTable, PredictionRow, PredictionTable};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Persisted parameters of a trained drift model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftArtifact {
    pub drift: f64,
    pub rows: usize,
    pub data_hash: String,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

pub struct DriftModel {
    artifact_path: PathBuf,
    params: RwLock<Option<DriftArtifact>>,
}

impl DriftModel {
    pub const NAME: &'static str = "drift";

    pub fn new(artifact_dir: impl AsRef<Path>) -> Self {
        Self {
            artifact_path: artifact_dir.as_ref().join(format!("{}.json", Self::NAME)),
            params: RwLock::new(None),
        }
    }

    pub fn artifact_path(&self) -> &Path {
        &self.artifact_path
    }

    /// Currently loaded parameters, if any.
    pub fn params(&self) -> Option<DriftArtifact> {
        self.params
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_params(&self, artifact: DriftArtifact) {
        *self.params.write().unwrap_or_else(|e| e.into_inner()) = Some(artifact);
    }

    fn fit(data: &OhlcvTable) -> Result<DriftArtifact, ModelError> {
        if data.len() < 2 {
            return Err(ModelError::InsufficientData(format!(
                "need at least 2 rows, got {}",
                data.len()
            )));
        }

        let closes: Vec<f64> = data.closes().collect();
        if let Some(bad) = closes.iter().find(|c| !(c.is_finite() && **c > 0.0)) {
            return Err(ModelError::InsufficientData(format!(
                "close prices must be positive, found {bad}"
            )));
        }

        let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
        let drift = returns.iter().sum::<f64>() / returns.len() as f64;

        Ok(DriftArtifact {
            drift,
            rows: data.len(),
            data_hash: blake3::hash(&serde_json::to_vec(data)?)
                .to_hex()
                .to_string(),
            trained_at: chrono::Utc::now(),
        })
    }

    fn save(&self, artifact: &DriftArtifact) -> Result<(), ModelError> {
        if let Some(dir) = self.artifact_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.artifact_path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(artifact)?)?;
        fs::rename(&tmp, &self.artifact_path)?;
        Ok(())
    }
}

impl Model for DriftModel {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self) -> Result<(), ModelError> {
        if !self.artifact_path.exists() {
            return Err(ModelError::ArtifactMissing {
                path: self.artifact_path.clone(),
            });
        }
        let content = fs::read_to_string(&self.artifact_path)?;
        let artifact: DriftArtifact = serde_json::from_str(&content)?;
        tracing::debug!(drift = artifact.drift, rows = artifact.rows, "loaded drift model");
        self.set_params(artifact);
        Ok(())
    }

    fn train(&self, data: &OhlcvTable) -> Result<(), ModelError> {
        let artifact = Self::fit(data)?;
        self.save(&artifact)?;
        tracing::info!(
            drift = artifact.drift,
            rows = artifact.rows,
            path = %self.artifact_path.display(),
            "trained drift model"
        );
        self.set_params(artifact);
        Ok(())
    }

    fn inference(&self, data: &OhlcvTable) -> Result<PredictionTable, ModelError> {
        let params = self
            .params()
            .ok_or_else(|| ModelError::NotLoaded(Self::NAME.to_string()))?;
        let growth = params.drift.exp();

        let rows = data
            .rows()
            .iter()
            .map(|row| PredictionRow {
                row: row.clone(),
                prediction: row.close * growth,
            })
            .collect();
        Ok(PredictionTable::new(rows))
    }
}

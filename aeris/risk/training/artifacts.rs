use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    features::{encoder::CityEncoder, scaler::StandardScaler},
    model::RiskModel,
};

/// File name of the serialized bundle inside the artifact directory.
pub const ARTIFACT_FILE: &str = "artifacts.json";

/// Errors raised while persisting or loading artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// Filesystem failure.
    #[error("artifact io: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure.
    #[error("artifact encoding: {0}")]
    Json(#[from] serde_json::Error),
    /// The bundle's dimensions disagree with each other.
    #[error("artifact bundle misaligned: {0}")]
    Misaligned(String),
}

/// Bundle produced by training and consumed read-only by the serving path.
///
/// Created once per training run, loaded at service start, immutable during
/// serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    /// Authoritative feature column order.
    pub feature_columns: Vec<String>,
    /// Pre-fit categorical city encoder.
    pub encoder: CityEncoder,
    /// Pre-fit feature scaler.
    pub scaler: StandardScaler,
    /// Trained model weights.
    pub model: RiskModel,
}

impl ModelArtifacts {
    /// Assembles a bundle, validating cross-field dimensions.
    pub fn new(
        feature_columns: Vec<String>,
        encoder: CityEncoder,
        scaler: StandardScaler,
        model: RiskModel,
    ) -> Result<Self, ArtifactError> {
        let bundle = Self {
            feature_columns,
            encoder,
            scaler,
            model,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Persists the bundle under `dir` via a staging file and rename, so a
    /// failed run never leaves a partial bundle behind.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(dir)?;
        let target = dir.join(ARTIFACT_FILE);
        let staging = dir.join(format!("{ARTIFACT_FILE}.tmp"));
        fs::write(&staging, serde_json::to_vec_pretty(self)?)?;
        fs::rename(&staging, &target)?;
        Ok(target)
    }

    /// Loads and validates a bundle from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let contents = fs::read_to_string(path)?;
        let bundle: Self = serde_json::from_str(&contents)?;
        bundle.validate()?;
        Ok(bundle)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.feature_columns.is_empty() {
            return Err(ArtifactError::Misaligned(
                "no feature columns declared".to_string(),
            ));
        }
        if self.scaler.width() != self.feature_columns.len() {
            return Err(ArtifactError::Misaligned(format!(
                "scaler width {} vs {} declared columns",
                self.scaler.width(),
                self.feature_columns.len()
            )));
        }
        if self.model.input_dim() != self.feature_columns.len() {
            return Err(ArtifactError::Misaligned(format!(
                "model input width {} vs {} declared columns",
                self.model.input_dim(),
                self.feature_columns.len()
            )));
        }
        Ok(())
    }
}

//! Offline training pipeline producing the artifacts the serving path
//! depends on: feature column order, categorical encoder, scaler, and model
//! weights.

/// Artifact bundle persistence.
pub mod artifacts;
/// Historical record loading, labeling, and synthesis.
pub mod dataset;
/// Gradient-descent head fitting.
pub mod trainer;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use aeris_logging::LogLevel;

use crate::{
    features::scaler::StandardScaler, model::RiskModel, telemetry::RiskTelemetry,
    thresholds::default_limits,
};
use artifacts::ModelArtifacts;
use dataset::{train_test_split, TrainingSet};
use trainer::HeadTrainer;

/// Hyperparameters for a training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Hidden width shared by the encoder, attention, and heads.
    pub hidden_dim: usize,
    /// Epoch budget.
    pub epochs: usize,
    /// Head learning rate.
    pub learning_rate: f32,
    /// Held-out fraction for evaluation.
    pub test_ratio: f32,
    /// Weight initialization seed.
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            hidden_dim: 32,
            epochs: 200,
            learning_rate: 0.1,
            test_ratio: 0.2,
            seed: 7,
        }
    }
}

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Run identifier.
    pub run_id: Uuid,
    /// Number of training records.
    pub samples: usize,
    /// Declared feature column count.
    pub feature_columns: usize,
    /// Epochs executed.
    pub epochs: usize,
    /// Final training loss (summed MSE over the three heads).
    pub train_loss: f32,
    /// Held-out loss.
    pub test_loss: f32,
}

impl TrainingReport {
    /// Concise one-line summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "[train] run={} samples={} columns={} epochs={} train_loss={:.4} test_loss={:.4}",
            self.run_id,
            self.samples,
            self.feature_columns,
            self.epochs,
            self.train_loss,
            self.test_loss
        )
    }
}

/// End-to-end offline training pipeline.
#[derive(Debug, Default)]
pub struct TrainingPipeline {
    config: TrainingConfig,
}

impl TrainingPipeline {
    /// Creates a pipeline with the given hyperparameters.
    #[must_use]
    pub const fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Runs the pipeline and persists artifacts under `out_dir`.
    pub fn run(&self, set: &TrainingSet, out_dir: &Path) -> anyhow::Result<TrainingReport> {
        self.run_with_telemetry(set, out_dir, None)
    }

    /// Runs the pipeline with optional telemetry instrumentation.
    ///
    /// Data and fitting failures abort before any artifact is written; the
    /// previous bundle on disk stays intact.
    pub fn run_with_telemetry(
        &self,
        set: &TrainingSet,
        out_dir: &Path,
        telemetry: Option<&RiskTelemetry>,
    ) -> anyhow::Result<TrainingReport> {
        let run_id = Uuid::new_v4();
        let design = set.design(&default_limits())?;
        log(
            telemetry,
            LogLevel::Info,
            "training_design_built",
            json!({
                "run_id": run_id,
                "samples": design.rows.len(),
                "columns": design.columns.len(),
                "cities": design.encoder.len(),
            }),
        );

        let (train_rows, train_targets, test_rows, test_targets) =
            train_test_split(&design.rows, &design.targets, self.config.test_ratio);
        let scaler = StandardScaler::fit(&train_rows);
        let train_scaled = scaler.transform_batch(&train_rows)?;
        let test_scaled = scaler.transform_batch(&test_rows)?;

        let mut model = RiskModel::new(
            design.columns.len(),
            self.config.hidden_dim,
            self.config.seed,
        );
        let head_trainer = HeadTrainer::new(self.config.learning_rate, self.config.epochs);
        let reports = head_trainer.fit(&mut model, &train_scaled, &train_targets)?;
        let train_loss = reports.last().map_or(0.0, |report| report.loss);
        let test_loss = if test_scaled.is_empty() {
            train_loss
        } else {
            head_trainer.evaluate(&model, &test_scaled, &test_targets)?
        };
        log(
            telemetry,
            LogLevel::Info,
            "training_complete",
            json!({ "run_id": run_id, "train_loss": train_loss, "test_loss": test_loss }),
        );

        let bundle = ModelArtifacts::new(design.columns, design.encoder, scaler, model)?;
        let path = bundle.save(out_dir)?;
        log(
            telemetry,
            LogLevel::Info,
            "artifacts_written",
            json!({ "run_id": run_id, "path": path }),
        );
        if let Some(telemetry) = telemetry {
            let _ = telemetry.event(
                "training.report",
                json!({ "run_id": run_id, "train_loss": train_loss, "test_loss": test_loss }),
            );
        }

        Ok(TrainingReport {
            run_id,
            samples: set.records.len(),
            feature_columns: bundle.feature_columns.len(),
            epochs: self.config.epochs,
            train_loss,
            test_loss,
        })
    }
}

fn log(telemetry: Option<&RiskTelemetry>, level: LogLevel, message: &str, fields: serde_json::Value) {
    if let Some(telemetry) = telemetry {
        let _ = telemetry.log(level, message, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn pipeline_produces_loadable_artifacts() {
        let dir = tempdir().unwrap();
        let set = TrainingSet::synthetic(50, 21);
        let config = TrainingConfig {
            hidden_dim: 8,
            epochs: 20,
            ..TrainingConfig::default()
        };
        let report = TrainingPipeline::new(config).run(&set, dir.path()).unwrap();
        assert_eq!(report.samples, 50);
        assert_eq!(report.feature_columns, 15);
        let bundle =
            ModelArtifacts::load(dir.path().join(artifacts::ARTIFACT_FILE)).unwrap();
        assert_eq!(bundle.feature_columns.len(), 15);
    }

    #[test]
    fn empty_set_aborts_without_artifacts() {
        let dir = tempdir().unwrap();
        let result = TrainingPipeline::default().run(&TrainingSet::default(), dir.path());
        assert!(result.is_err());
        assert!(!dir.path().join(artifacts::ARTIFACT_FILE).exists());
    }
}

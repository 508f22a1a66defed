//! Online monitoring runtime tying feature construction, the risk model, the
//! deterministic engines, and decision fusion into one scoring path.

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use thiserror::Error;

use aeris_logging::LogLevel;

use crate::{
    features::{builder::FeatureBuilder, FeatureAlignmentError},
    fusion::determine_risk_level,
    model::ShapeMismatchError,
    reading::{SensorReading, Verdict},
    rules,
    telemetry::RiskTelemetry,
    thresholds::ThresholdTable,
    training::artifacts::ModelArtifacts,
};

/// Errors fatal to a single scoring request, never to the process.
#[derive(Debug, Error)]
pub enum ScoreError {
    /// Feature schema could not be resolved against the loaded artifacts.
    #[error(transparent)]
    Alignment(#[from] FeatureAlignmentError),
    /// Input width disagreed with the model.
    #[error(transparent)]
    Shape(#[from] ShapeMismatchError),
}

/// Online scoring runtime.
///
/// Owns the read-only artifacts, the mutable threshold table, and the
/// latest-verdict slot. One instance serves the whole process; scoring runs
/// concurrently with administrative threshold updates.
pub struct MonitoringRuntime {
    artifacts: ModelArtifacts,
    thresholds: ThresholdTable,
    latest: RwLock<Option<Verdict>>,
    telemetry: Option<RiskTelemetry>,
}

impl MonitoringRuntime {
    /// Creates a runtime over trained artifacts with the built-in limits.
    #[must_use]
    pub fn new(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts,
            thresholds: ThresholdTable::default(),
            latest: RwLock::new(None),
            telemetry: None,
        }
    }

    /// Replaces the threshold table (site-specific limits).
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: ThresholdTable) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Attaches telemetry sinks.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: RiskTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Shared threshold table handle (the administrative read/update surface).
    #[must_use]
    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    /// Most recent verdict, if any reading has been scored yet.
    #[must_use]
    pub fn latest(&self) -> Option<Verdict> {
        self.latest.read().clone()
    }

    /// Scores one reading end to end.
    ///
    /// Feature construction → model scores → threshold alerts → compound rule
    /// findings → fused level and actions. A failure here invalidates this
    /// request only; subsequent readings keep scoring.
    pub fn score(&self, reading: &SensorReading) -> Result<Verdict, ScoreError> {
        let now = Utc::now();
        let builder =
            FeatureBuilder::new(&self.artifacts.feature_columns, &self.artifacts.encoder)?;
        let built = builder.build(reading, now);
        if built.city_fallback {
            self.log(
                LogLevel::Warn,
                "unknown city encoded as 0",
                json!({ "city": reading.city }),
            );
            self.emit("monitor.city_fallback", json!({ "city": reading.city }));
        }

        let scaled = self.artifacts.scaler.transform(&built.values)?;
        let predictions = self.artifacts.model.score_single(&scaled)?;
        let alerts = self.thresholds.check(&reading.pollutants, now);
        let findings = rules::evaluate(&reading.explosion_parameters, &self.thresholds.snapshot());
        let level = determine_risk_level(&predictions, &alerts, &findings);

        let verdict = Verdict::assemble(reading, now, predictions, alerts, findings, level);
        *self.latest.write() = Some(verdict.clone());
        self.log(
            LogLevel::Info,
            "reading scored",
            json!({
                "city": reading.city,
                "risk_level": verdict.risk_level,
                "risk_status": verdict.risk_status,
                "alerts": verdict.alerts.len(),
                "findings": verdict.explosion_risks.len(),
            }),
        );
        self.emit(
            "monitor.verdict",
            json!({ "risk_level": verdict.risk_level, "risk_status": verdict.risk_status }),
        );
        Ok(verdict)
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, fields);
        }
    }

    fn emit(&self, event_type: &str, payload: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(event_type, payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        features::{encoder::CityEncoder, scaler::StandardScaler},
        model::RiskModel,
        training::{
            dataset::{TrainingRecord, TrainingSet},
            TrainingConfig, TrainingPipeline,
        },
    };
    use chrono::NaiveDate;
    use indexmap::IndexMap;
    use tempfile::tempdir;

    fn reading(
        city: &str,
        pollutants: &[(&str, f32)],
        explosion: &[(&str, f32)],
    ) -> SensorReading {
        SensorReading {
            city: city.to_string(),
            pollutants: pollutants
                .iter()
                .map(|(name, value)| ((*name).to_string(), *value))
                .collect(),
            explosion_parameters: explosion
                .iter()
                .map(|(name, value)| ((*name).to_string(), *value))
                .collect(),
        }
    }

    /// Artifacts over an untrained model, enough to exercise the pipeline
    /// where the exact model scores do not matter.
    fn untrained_artifacts() -> ModelArtifacts {
        let columns: Vec<String> = [
            "Suspended Particles",
            "Sulfur Dioxide",
            "Carbon Monoxide",
            "Methane",
            "Temperature",
            "Pressure",
            "Oxygen_Level",
            "month",
            "day",
            "day_of_week",
            "city_encoded",
        ]
        .iter()
        .map(|name| (*name).to_string())
        .collect();
        let width = columns.len();
        ModelArtifacts::new(
            columns,
            CityEncoder::fit(["Chicago", "Houston"]),
            StandardScaler::identity(width),
            RiskModel::new(width, 8, 5),
        )
        .unwrap()
    }

    /// Artifacts trained on quiet data, so the model scores sit well below
    /// the WARNING cutoff for nominal readings.
    fn trained_artifacts(dir: &std::path::Path) -> ModelArtifacts {
        let mut records = Vec::new();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let cities = ["Chicago", "Houston", "Phoenix"];
        for idx in 0..60 {
            let wiggle = (idx % 7) as f32 * 0.01;
            let values = IndexMap::from([
                ("Suspended Particles".to_string(), 0.07 + wiggle * 0.1),
                ("Sulfur Dioxide".to_string(), 0.02 + wiggle * 0.1),
                ("Carbon Monoxide".to_string(), 1.5 + wiggle),
                ("Methane".to_string(), 420.0 + (idx % 11) as f32),
                ("Temperature".to_string(), 24.0 + (idx % 5) as f32),
                ("Pressure".to_string(), 1.4 + wiggle),
                ("Oxygen_Level".to_string(), 20.8 + wiggle),
                ("VOC".to_string(), 60.0 + (idx % 9) as f32),
            ]);
            records.push(TrainingRecord {
                date: start + chrono::Duration::days(idx),
                city: cities[(idx % 3) as usize].to_string(),
                values,
            });
        }
        let config = TrainingConfig {
            hidden_dim: 16,
            epochs: 500,
            learning_rate: 0.1,
            ..TrainingConfig::default()
        };
        TrainingPipeline::new(config)
            .run(&TrainingSet { records }, dir)
            .unwrap();
        ModelArtifacts::load(dir.join("artifacts.json")).unwrap()
    }

    #[test]
    fn nominal_reading_scores_normal_end_to_end() {
        let dir = tempdir().unwrap();
        let runtime = MonitoringRuntime::new(trained_artifacts(dir.path()));
        // Pollutants at half their limits, explosion parameters nominal.
        let verdict = runtime
            .score(&reading(
                "Chicago",
                &[
                    ("Suspended Particles", 0.075),
                    ("Sulfur Dioxide", 0.025),
                    ("Carbon Monoxide", 1.5),
                ],
                &[
                    ("Methane", 450.0),
                    ("Temperature", 25.0),
                    ("Pressure", 1.5),
                    ("Oxygen_Level", 20.9),
                ],
            ))
            .unwrap();
        assert!(verdict.predictions.explosion_risk < 0.4);
        assert!(verdict.predictions.gas_leak_risk < 0.4);
        assert!(verdict.alerts.is_empty());
        assert!(verdict.explosion_risks.is_empty());
        assert_eq!(verdict.risk_level, 0);
        assert_eq!(verdict.risk_status, "NORMAL");
        assert_eq!(
            verdict.recommended_actions,
            vec![
                "Continue normal monitoring".to_string(),
                "Maintain regular safety checks".to_string(),
            ]
        );
    }

    #[test]
    fn critical_compound_condition_forces_evacuation() {
        let runtime = MonitoringRuntime::new(untrained_artifacts());
        let verdict = runtime
            .score(&reading(
                "Chicago",
                &[],
                &[("Temperature", 90.0), ("Pressure", 2.2)],
            ))
            .unwrap();
        assert_eq!(verdict.risk_level, 4);
        assert_eq!(verdict.risk_status, "IMMEDIATE_EVAC");
        assert_eq!(verdict.recommended_actions[0], "IMMEDIATE EVACUATION REQUIRED");
    }

    #[test]
    fn unknown_city_degrades_instead_of_failing() {
        let runtime = MonitoringRuntime::new(untrained_artifacts());
        let verdict = runtime.score(&reading("Atlantis", &[], &[])).unwrap();
        assert!(verdict.risk_level <= 4);
        assert!(runtime.latest().is_some());
    }

    #[test]
    fn latest_verdict_tracks_the_most_recent_reading() {
        let runtime = MonitoringRuntime::new(untrained_artifacts());
        assert!(runtime.latest().is_none());
        runtime
            .score(&reading("Chicago", &[("Carbon Monoxide", 3.5)], &[]))
            .unwrap();
        let latest = runtime.latest().unwrap();
        assert_eq!(latest.alerts.len(), 1);
        assert_eq!(latest.alerts[0].parameter, "Carbon Monoxide");
    }

    #[test]
    fn threshold_updates_apply_to_subsequent_scoring() {
        let runtime = MonitoringRuntime::new(untrained_artifacts());
        runtime
            .thresholds()
            .merge_update(IndexMap::from([("Carbon Monoxide".to_string(), 1.0f32)]))
            .unwrap();
        let verdict = runtime
            .score(&reading("Chicago", &[("Carbon Monoxide", 2.0)], &[]))
            .unwrap();
        assert_eq!(verdict.alerts.len(), 1);
        assert!((verdict.alerts[0].threshold - 1.0).abs() < f32::EPSILON);
    }
}

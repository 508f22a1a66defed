#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! AERIS risk-scoring core: feature construction from raw sensor readings, a
//! multi-head sequence model, deterministic threshold and compound-rule
//! engines, and the fusion logic combining all of them into one verdict.

/// Sensor reading and verdict schemas.
#[path = "../reading.rs"]
pub mod reading;

/// Per-parameter limit table and the threshold engine.
#[path = "../thresholds.rs"]
pub mod thresholds;

/// Compound explosion rule engine.
#[path = "../rules.rs"]
pub mod rules;

/// Feature construction: categorical encoding, scaling, fixed-order assembly.
#[path = "../features/main.rs"]
pub mod features;

/// Multi-head sequence model.
#[path = "../model/main.rs"]
pub mod model;

/// Decision fusion reducer and the recommended-action catalog.
#[path = "../fusion.rs"]
pub mod fusion;

/// Offline training pipeline producing the serving artifacts.
#[path = "../training/main.rs"]
pub mod training;

/// Telemetry sinks threaded through the scoring and training paths.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// Online monitoring runtime.
#[path = "../main.rs"]
pub mod monitor;

pub use features::{
    builder::{BuiltFeatures, FeatureBuilder},
    encoder::CityEncoder,
    scaler::StandardScaler,
    FeatureAlignmentError,
};
pub use fusion::{determine_risk_level, recommended_actions, RiskLevel};
pub use model::{RiskModel, RiskScores, ShapeMismatchError};
pub use monitor::{MonitoringRuntime, ScoreError};
pub use reading::{SensorReading, Verdict};
pub use rules::{ExplosionRiskFinding, FindingKind, Severity};
pub use telemetry::{EventSink, RiskTelemetry, RiskTelemetryBuilder};
pub use thresholds::{default_limits, Alert, ThresholdError, ThresholdTable};
pub use training::{
    artifacts::ModelArtifacts,
    dataset::{TrainingDataError, TrainingRecord, TrainingSet},
    TrainingConfig, TrainingPipeline, TrainingReport,
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    fusion::{recommended_actions, RiskLevel},
    model::RiskScores,
    rules::ExplosionRiskFinding,
    thresholds::Alert,
};

/// One raw sensor reading submitted for scoring.
///
/// Both value maps may be partially populated: absent parameters default to
/// zero during feature construction and are skipped by the threshold and rule
/// engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorReading {
    /// Site identifier the reading originates from.
    pub city: String,
    /// Pollutant name → concentration.
    #[serde(default)]
    pub pollutants: IndexMap<String, f32>,
    /// Explosion-precursor parameter name → value.
    #[serde(default)]
    pub explosion_parameters: IndexMap<String, f32>,
}

/// Unified verdict emitted for every scored reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Evaluation timestamp.
    pub timestamp: DateTime<Utc>,
    /// Echo of the pollutant readings.
    pub pollutants: IndexMap<String, f32>,
    /// Echo of the explosion-parameter readings.
    pub explosion_parameters: IndexMap<String, f32>,
    /// Model risk scores.
    pub predictions: RiskScores,
    /// Threshold violations, in input order.
    pub alerts: Vec<Alert>,
    /// Compound rule findings.
    pub explosion_risks: Vec<ExplosionRiskFinding>,
    /// Ordinal risk level code (0 = NORMAL … 4 = IMMEDIATE_EVAC).
    pub risk_level: u8,
    /// Risk level name matching the code.
    pub risk_status: String,
    /// Ordered recommended actions for the level.
    pub recommended_actions: Vec<String>,
}

impl Verdict {
    /// Assembles the verdict for a reading from the fused evaluation results.
    #[must_use]
    pub fn assemble(
        reading: &SensorReading,
        timestamp: DateTime<Utc>,
        predictions: RiskScores,
        alerts: Vec<Alert>,
        explosion_risks: Vec<ExplosionRiskFinding>,
        level: RiskLevel,
    ) -> Self {
        Self {
            timestamp,
            pollutants: reading.pollutants.clone(),
            explosion_parameters: reading.explosion_parameters.clone(),
            predictions,
            alerts,
            explosion_risks,
            risk_level: level.code(),
            risk_status: level.name().to_string(),
            recommended_actions: recommended_actions(level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_deserializes_with_missing_maps() {
        let reading: SensorReading = serde_json::from_str(r#"{ "city": "Kharkiv" }"#).unwrap();
        assert_eq!(reading.city, "Kharkiv");
        assert!(reading.pollutants.is_empty());
        assert!(reading.explosion_parameters.is_empty());
    }

    #[test]
    fn verdict_carries_level_code_and_name() {
        let reading = SensorReading {
            city: "Kharkiv".into(),
            pollutants: IndexMap::new(),
            explosion_parameters: IndexMap::new(),
        };
        let verdict = Verdict::assemble(
            &reading,
            Utc::now(),
            RiskScores {
                pollution_risk: 0.1,
                explosion_risk: 0.1,
                gas_leak_risk: 0.1,
            },
            Vec::new(),
            Vec::new(),
            RiskLevel::Warning,
        );
        assert_eq!(verdict.risk_level, 2);
        assert_eq!(verdict.risk_status, "WARNING");
        assert_eq!(verdict.recommended_actions.len(), 4);
    }
}

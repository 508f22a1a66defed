use serde::{Deserialize, Serialize};

use crate::{
    model::RiskScores,
    rules::{ExplosionRiskFinding, Severity},
    thresholds::Alert,
};

/// Ordinal severity classification of the current sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// No elevated risk.
    Normal = 0,
    /// Heightened monitoring advised.
    Attention = 1,
    /// Active mitigation advised.
    Warning = 2,
    /// Emergency protocols advised.
    Danger = 3,
    /// Unconditional evacuation.
    ImmediateEvac = 4,
}

impl RiskLevel {
    /// Numeric code used in the verdict schema.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Canonical upper-case name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Attention => "ATTENTION",
            Self::Warning => "WARNING",
            Self::Danger => "DANGER",
            Self::ImmediateEvac => "IMMEDIATE_EVAC",
        }
    }
}

/// Model score above which a head alone escalates to DANGER.
pub const MODEL_DANGER_CUTOFF: f32 = 0.7;
/// Model score above which a head alone escalates to WARNING.
pub const MODEL_WARNING_CUTOFF: f32 = 0.4;

/// Combines model scores, threshold alerts, and compound findings into one level.
///
/// The level only ever increases within one evaluation. A CRITICAL finding is
/// an unconditional override to IMMEDIATE_EVAC regardless of model scores; a
/// HIGH finding raises the level to at least DANGER. Pure and idempotent.
#[must_use]
pub fn determine_risk_level(
    predictions: &RiskScores,
    alerts: &[Alert],
    findings: &[ExplosionRiskFinding],
) -> RiskLevel {
    let mut level = RiskLevel::Normal;

    if predictions.explosion_risk > MODEL_DANGER_CUTOFF
        || predictions.gas_leak_risk > MODEL_DANGER_CUTOFF
    {
        level = level.max(RiskLevel::Danger);
    } else if predictions.explosion_risk > MODEL_WARNING_CUTOFF
        || predictions.gas_leak_risk > MODEL_WARNING_CUTOFF
    {
        level = level.max(RiskLevel::Warning);
    }

    if alerts.len() > 2 {
        level = level.max(RiskLevel::Warning);
    } else if !alerts.is_empty() {
        level = level.max(RiskLevel::Attention);
    }

    for finding in findings {
        match finding.severity {
            Severity::Critical => level = RiskLevel::ImmediateEvac,
            Severity::High => level = level.max(RiskLevel::Danger),
        }
    }

    level
}

/// Fixed, ordered recommended-action catalog for a risk level.
#[must_use]
pub fn recommended_actions(level: RiskLevel) -> Vec<String> {
    let actions: &[&str] = match level {
        RiskLevel::Normal => &["Continue normal monitoring", "Maintain regular safety checks"],
        RiskLevel::Attention => &[
            "Increase monitoring frequency",
            "Check ventilation systems",
            "Notify shift supervisor",
        ],
        RiskLevel::Warning => &[
            "Activate additional ventilation",
            "Restrict non-essential personnel",
            "Prepare emergency response team",
            "Begin equipment safety checks",
        ],
        RiskLevel::Danger => &[
            "Initiate emergency protocols",
            "Evacuate non-essential personnel",
            "Contact emergency response team",
            "Shutdown non-critical operations",
        ],
        RiskLevel::ImmediateEvac => &[
            "IMMEDIATE EVACUATION REQUIRED",
            "Sound emergency alarms",
            "Contact emergency services",
            "Initiate emergency shutdown procedures",
        ],
    };
    actions.iter().map(|action| (*action).to_string()).collect()
}

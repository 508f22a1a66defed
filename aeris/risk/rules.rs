use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Compound condition categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    /// Flammable gas concentration together with sufficient oxygen.
    #[serde(rename = "GAS_MIXTURE")]
    GasMixture,
    /// Combined temperature and pressure excursion.
    #[serde(rename = "TEMP_PRESSURE")]
    TempPressure,
}

/// Severity attached to a compound finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Escalates fusion to at least DANGER.
    High,
    /// Unconditionally forces IMMEDIATE_EVAC in fusion.
    Critical,
}

/// Finding produced by compound rule evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplosionRiskFinding {
    /// Rule that fired.
    #[serde(rename = "type")]
    pub kind: FindingKind,
    /// HIGH or CRITICAL.
    pub severity: Severity,
    /// Operator-facing description.
    pub description: String,
}

/// Fraction of the methane limit above which a mixture becomes a concern.
const METHANE_FRACTION: f32 = 0.1;
/// Oxygen percentage sufficient to sustain combustion.
const OXYGEN_COMBUSTION_FLOOR: f32 = 19.5;
/// Fraction of the temperature limit for the compound excursion check.
const TEMPERATURE_FRACTION: f32 = 0.8;
/// Fraction of the pressure limit for the compound excursion check.
const PRESSURE_FRACTION: f32 = 0.9;

// Substitutes for absent parameters: ambient oxygen and atmospheric pressure.
const DEFAULT_OXYGEN: f32 = 21.0;
const DEFAULT_PRESSURE: f32 = 1.0;

// Fallback limits when the table lacks an entry.
const FALLBACK_METHANE_LIMIT: f32 = 5000.0;
const FALLBACK_TEMPERATURE_LIMIT: f32 = 60.0;
const FALLBACK_PRESSURE_LIMIT: f32 = 2.0;

/// Evaluates the compound explosion conditions over the given parameters.
///
/// Absent parameters substitute a safe ambient default rather than failing.
/// The two checks are independent: both, one, or neither may fire.
#[must_use]
pub fn evaluate(
    parameters: &IndexMap<String, f32>,
    limits: &IndexMap<String, f32>,
) -> Vec<ExplosionRiskFinding> {
    let mut findings = Vec::new();

    let methane = parameters.get("Methane").copied().unwrap_or(0.0);
    let oxygen = parameters
        .get("Oxygen_Level")
        .copied()
        .unwrap_or(DEFAULT_OXYGEN);
    let methane_limit = limits
        .get("Methane")
        .copied()
        .unwrap_or(FALLBACK_METHANE_LIMIT);
    if methane > METHANE_FRACTION * methane_limit && oxygen > OXYGEN_COMBUSTION_FLOOR {
        findings.push(ExplosionRiskFinding {
            kind: FindingKind::GasMixture,
            severity: Severity::High,
            description: "Potentially explosive gas mixture detected".to_string(),
        });
    }

    let temperature = parameters.get("Temperature").copied().unwrap_or(0.0);
    let pressure = parameters
        .get("Pressure")
        .copied()
        .unwrap_or(DEFAULT_PRESSURE);
    let temperature_limit = limits
        .get("Temperature")
        .copied()
        .unwrap_or(FALLBACK_TEMPERATURE_LIMIT);
    let pressure_limit = limits
        .get("Pressure")
        .copied()
        .unwrap_or(FALLBACK_PRESSURE_LIMIT);
    if temperature > TEMPERATURE_FRACTION * temperature_limit
        && pressure > PRESSURE_FRACTION * pressure_limit
    {
        findings.push(ExplosionRiskFinding {
            kind: FindingKind::TempPressure,
            severity: Severity::Critical,
            description: "Dangerous temperature-pressure combination".to_string(),
        });
    }

    findings
}

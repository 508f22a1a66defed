use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Threshold violation raised when an observed value strictly exceeds its limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    /// Offending parameter name.
    pub parameter: String,
    /// Observed value.
    pub value: f32,
    /// Configured limit at evaluation time.
    pub threshold: f32,
    /// Evaluation timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Errors raised by threshold table updates.
#[derive(Debug, Error)]
pub enum ThresholdError {
    /// A supplied limit was negative or not finite.
    #[error("invalid limit {value} for parameter {parameter}")]
    InvalidLimit {
        /// Parameter whose limit was rejected.
        parameter: String,
        /// Rejected value.
        value: f32,
    },
}

/// Built-in facility limits for the monitored parameters.
#[must_use]
pub fn default_limits() -> IndexMap<String, f32> {
    IndexMap::from([
        // Pollutants, mg/m³
        ("Suspended Particles".to_string(), 0.15),
        ("Sulfur Dioxide".to_string(), 0.05),
        ("Carbon Monoxide".to_string(), 3.0),
        ("Nitrogen Dioxide".to_string(), 0.085),
        ("Sulfates".to_string(), 0.025),
        // Explosion precursors
        ("Methane".to_string(), 5000.0),  // ppm
        ("Hydrogen".to_string(), 4000.0), // ppm
        ("Temperature".to_string(), 60.0), // °C
        ("Pressure".to_string(), 2.0),     // bar
        ("Oxygen_Level".to_string(), 23.5), // %
        ("VOC".to_string(), 100.0),         // ppm
    ])
}

/// Shared per-parameter limit table.
///
/// Reads run concurrently with scoring; administrative merge updates replace
/// only the supplied keys and are atomic per key set: a reader sees either
/// the fully-old or the fully-new values, never a partial write.
#[derive(Debug, Clone)]
pub struct ThresholdTable {
    inner: Arc<RwLock<IndexMap<String, f32>>>,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::new(default_limits())
    }
}

impl ThresholdTable {
    /// Creates a table over the given limits.
    #[must_use]
    pub fn new(limits: IndexMap<String, f32>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(limits)),
        }
    }

    /// Copy of the full table.
    #[must_use]
    pub fn snapshot(&self) -> IndexMap<String, f32> {
        self.inner.read().clone()
    }

    /// Limit for a single parameter, if configured.
    #[must_use]
    pub fn get(&self, parameter: &str) -> Option<f32> {
        self.inner.read().get(parameter).copied()
    }

    /// Merges the supplied limits into the table.
    ///
    /// Every value is validated before any key is touched, so a rejected
    /// update leaves the table unchanged.
    pub fn merge_update(&self, updates: IndexMap<String, f32>) -> Result<(), ThresholdError> {
        for (parameter, value) in &updates {
            if !value.is_finite() || *value < 0.0 {
                return Err(ThresholdError::InvalidLimit {
                    parameter: parameter.clone(),
                    value: *value,
                });
            }
        }
        let mut limits = self.inner.write();
        for (parameter, value) in updates {
            limits.insert(parameter, value);
        }
        Ok(())
    }

    /// Emits an alert for every value strictly above its configured limit.
    ///
    /// Parameters without a configured limit are skipped. Alert order follows
    /// the insertion order of the input map.
    #[must_use]
    pub fn check(&self, values: &IndexMap<String, f32>, timestamp: DateTime<Utc>) -> Vec<Alert> {
        let limits = self.inner.read();
        values
            .iter()
            .filter_map(|(parameter, value)| {
                let limit = limits.get(parameter)?;
                (value > limit).then(|| Alert {
                    parameter: parameter.clone(),
                    value: *value,
                    threshold: *limit,
                    timestamp,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pairs: &[(&str, f32)]) -> IndexMap<String, f32> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), *value))
            .collect()
    }

    #[test]
    fn value_equal_to_limit_raises_no_alert() {
        let table = ThresholdTable::default();
        let alerts = table.check(&values(&[("Carbon Monoxide", 3.0)]), Utc::now());
        assert!(alerts.is_empty());
    }

    #[test]
    fn strict_exceedance_raises_alert_with_context() {
        let table = ThresholdTable::default();
        let alerts = table.check(&values(&[("Carbon Monoxide", 3.5)]), Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].parameter, "Carbon Monoxide");
        assert!((alerts[0].value - 3.5).abs() < f32::EPSILON);
        assert!((alerts[0].threshold - 3.0).abs() < f32::EPSILON);
    }

    #[test]
    fn unknown_parameters_are_skipped() {
        let table = ThresholdTable::default();
        let alerts = table.check(&values(&[("Unobtanium", 99.0)]), Utc::now());
        assert!(alerts.is_empty());
    }

    #[test]
    fn alerts_follow_input_order() {
        let table = ThresholdTable::default();
        let alerts = table.check(
            &values(&[("Sulfates", 1.0), ("Suspended Particles", 1.0)]),
            Utc::now(),
        );
        assert_eq!(alerts[0].parameter, "Sulfates");
        assert_eq!(alerts[1].parameter, "Suspended Particles");
    }

    #[test]
    fn merge_update_touches_only_supplied_keys() {
        let table = ThresholdTable::default();
        table
            .merge_update(values(&[("Methane", 4200.0)]))
            .unwrap();
        assert!((table.get("Methane").unwrap() - 4200.0).abs() < f32::EPSILON);
        assert!((table.get("Pressure").unwrap() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rejected_update_leaves_table_unchanged() {
        let table = ThresholdTable::default();
        let result = table.merge_update(values(&[("Methane", 4200.0), ("Pressure", -1.0)]));
        assert!(result.is_err());
        assert!((table.get("Methane").unwrap() - 5000.0).abs() < f32::EPSILON);
    }
}

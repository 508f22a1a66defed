use std::{fs, path::Path};

use chrono::{Datelike, Duration, NaiveDate};
use indexmap::IndexMap;
use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{encoder::CityEncoder, CITY_COLUMN, TEMPORAL_COLUMNS};

/// Parameters treated as explosion precursors rather than pollutants when
/// deriving training targets.
pub const EXPLOSION_PARAMETERS: [&str; 6] = [
    "Methane",
    "Hydrogen",
    "Temperature",
    "Pressure",
    "Oxygen_Level",
    "VOC",
];

/// One historical reading used for offline training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingRecord {
    /// Observation date; the temporal features derive from it.
    pub date: NaiveDate,
    /// Site identifier.
    pub city: String,
    /// Parameter name → observed value, pollutants and precursors together.
    pub values: IndexMap<String, f32>,
}

/// Errors fatal to a training run. Raised before any artifact is written.
#[derive(Debug, Error)]
pub enum TrainingDataError {
    /// Dataset file could not be read.
    #[error("reading training data: {0}")]
    Io(#[from] std::io::Error),
    /// A record failed to parse.
    #[error("parsing training record at line {line}: {source}")]
    Parse {
        /// 1-based line number of the malformed record.
        line: usize,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// No usable records.
    #[error("training data contains no records")]
    Empty,
}

/// In-memory training set.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    /// Loaded records.
    pub records: Vec<TrainingRecord>,
}

impl TrainingSet {
    /// Loads newline-delimited JSON records from disk.
    pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Self, TrainingDataError> {
        let contents = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line)
                .map_err(|source| TrainingDataError::Parse { line: idx + 1, source })?;
            records.push(record);
        }
        if records.is_empty() {
            return Err(TrainingDataError::Empty);
        }
        Ok(Self { records })
    }

    /// Generates a synthetic set varying around nominal sensor baselines.
    ///
    /// Mirrors the reading producer used in demos: base ± variation per
    /// parameter, an occasional methane excursion, rotating cities.
    #[must_use]
    pub fn synthetic(count: usize, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let cities = ["New York", "Los Angeles", "Chicago", "Houston", "Phoenix"];
        let baselines: [(&str, f32, f32); 11] = [
            ("Suspended Particles", 0.15, 0.05),
            ("Sulfur Dioxide", 0.05, 0.02),
            ("Carbon Monoxide", 3.0, 0.5),
            ("Nitrogen Dioxide", 0.085, 0.02),
            ("Sulfates", 0.025, 0.01),
            ("Methane", 4500.0, 500.0),
            ("Hydrogen", 3500.0, 400.0),
            ("Temperature", 25.0, 5.0),
            ("Pressure", 1.5, 0.2),
            ("Oxygen_Level", 21.0, 0.5),
            ("VOC", 100.0, 20.0),
        ];
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let mut records = Vec::with_capacity(count);
        for idx in 0..count {
            let date = start + Duration::days((idx % 365) as i64);
            let city = cities[rng.gen_range(0..cities.len())];
            let mut values = IndexMap::new();
            for (name, base, variation) in baselines {
                values.insert(name.to_string(), base + rng.gen_range(-variation..variation));
            }
            // Occasional spike so the derived risk targets are not all zero.
            if rng.gen_bool(0.1) {
                if let Some(methane) = values.get_mut("Methane") {
                    *methane *= 1.4;
                }
            }
            records.push(TrainingRecord {
                date,
                city: city.to_string(),
                values,
            });
        }
        Self { records }
    }

    /// Builds the design matrix and fits the categorical encoder.
    ///
    /// Columns are the observed value names in first-seen order, followed by
    /// the temporal columns and the encoded city. This ordering is
    /// authoritative for all later inference.
    pub fn design(&self, limits: &IndexMap<String, f32>) -> Result<Design, TrainingDataError> {
        if self.records.is_empty() {
            return Err(TrainingDataError::Empty);
        }
        let mut value_columns: Vec<String> = Vec::new();
        for record in &self.records {
            for name in record.values.keys() {
                if !value_columns.iter().any(|existing| existing == name) {
                    value_columns.push(name.clone());
                }
            }
        }
        let encoder = CityEncoder::fit(self.records.iter().map(|record| record.city.clone()));

        let mut columns = value_columns.clone();
        columns.extend(TEMPORAL_COLUMNS.iter().map(|name| (*name).to_string()));
        columns.push(CITY_COLUMN.to_string());

        let mut rows = Vec::with_capacity(self.records.len());
        let mut targets = Vec::with_capacity(self.records.len());
        for record in &self.records {
            let mut row = vec![0.0f32; columns.len()];
            for (idx, column) in value_columns.iter().enumerate() {
                if let Some(value) = record.values.get(column) {
                    row[idx] = *value;
                }
            }
            let base = value_columns.len();
            row[base] = record.date.month() as f32;
            row[base + 1] = record.date.day() as f32;
            row[base + 2] = record.date.weekday().num_days_from_monday() as f32;
            row[base + 3] = encoder.transform(&record.city).unwrap_or(0) as f32;
            rows.push(row);
            targets.push(derive_targets(&record.values, limits));
        }

        Ok(Design {
            columns,
            encoder,
            rows,
            targets,
        })
    }
}

/// Feature matrix and targets derived from a training set.
#[derive(Debug, Clone)]
pub struct Design {
    /// Declared feature column order.
    pub columns: Vec<String>,
    /// Fitted city encoder.
    pub encoder: CityEncoder,
    /// Row-major feature matrix.
    pub rows: Vec<Vec<f32>>,
    /// Per-row `[pollution_level, explosion_risk, gas_leak_risk]` targets.
    pub targets: Vec<[f32; 3]>,
}

/// Derives the three training targets for one record.
///
/// A deterministic labeling heuristic, not ground truth: the pollution level
/// is the mean of the pollutant columns, the two risk targets are weighted
/// indicator combinations keyed to the configured limits.
#[must_use]
pub fn derive_targets(values: &IndexMap<String, f32>, limits: &IndexMap<String, f32>) -> [f32; 3] {
    let mut pollutant_sum = 0.0f32;
    let mut pollutant_count = 0usize;
    for (name, value) in values {
        if !EXPLOSION_PARAMETERS.contains(&name.as_str()) {
            pollutant_sum += value;
            pollutant_count += 1;
        }
    }
    let pollution_level = if pollutant_count == 0 {
        0.0
    } else {
        pollutant_sum / pollutant_count as f32
    };

    let limit = |name: &str, fallback: f32| limits.get(name).copied().unwrap_or(fallback);
    let value = |name: &str| values.get(name).copied().unwrap_or(0.0);

    let methane_limit = limit("Methane", 5000.0);
    let explosion_risk = indicator(value("Methane") > methane_limit) * 0.4
        + indicator(value("Temperature") > limit("Temperature", 60.0)) * 0.3
        + indicator(value("Pressure") > limit("Pressure", 2.0)) * 0.3;
    let gas_leak_risk = indicator(value("Methane") > 0.9 * methane_limit) * 0.5
        + indicator(value("VOC") > limit("VOC", 100.0)) * 0.5;

    [pollution_level, explosion_risk, gas_leak_risk]
}

/// Splits rows and targets into head/tail train and test partitions.
#[must_use]
pub fn train_test_split(
    rows: &[Vec<f32>],
    targets: &[[f32; 3]],
    test_ratio: f32,
) -> (Vec<Vec<f32>>, Vec<[f32; 3]>, Vec<Vec<f32>>, Vec<[f32; 3]>) {
    let boundary =
        ((1.0 - test_ratio.clamp(0.1, 0.9)) * rows.len() as f32).round() as usize;
    let mut train_rows = Vec::new();
    let mut train_targets = Vec::new();
    let mut test_rows = Vec::new();
    let mut test_targets = Vec::new();
    for (idx, (row, target)) in rows.iter().zip(targets).enumerate() {
        if idx < boundary {
            train_rows.push(row.clone());
            train_targets.push(*target);
        } else {
            test_rows.push(row.clone());
            test_targets.push(*target);
        }
    }
    (train_rows, train_targets, test_rows, test_targets)
}

fn indicator(condition: bool) -> f32 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thresholds::default_limits;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn design_appends_temporal_and_city_columns() {
        let set = TrainingSet::synthetic(20, 3);
        let design = set.design(&default_limits()).unwrap();
        assert_eq!(design.columns.len(), 11 + 3 + 1);
        assert_eq!(design.columns[11], "month");
        assert_eq!(design.columns[14], "city_encoded");
        assert_eq!(design.rows.len(), 20);
        assert_eq!(design.targets.len(), 20);
    }

    #[test]
    fn quiet_record_has_zero_risk_targets() {
        let values = IndexMap::from([
            ("Carbon Monoxide".to_string(), 1.0),
            ("Methane".to_string(), 400.0),
            ("Temperature".to_string(), 20.0),
        ]);
        let [pollution, explosion, gas_leak] = derive_targets(&values, &default_limits());
        assert!((pollution - 1.0).abs() < f32::EPSILON);
        assert!(explosion.abs() < f32::EPSILON);
        assert!(gas_leak.abs() < f32::EPSILON);
    }

    #[test]
    fn excursions_accumulate_weighted_targets() {
        let values = IndexMap::from([
            ("Methane".to_string(), 5200.0),
            ("Temperature".to_string(), 65.0),
            ("Pressure".to_string(), 2.1),
            ("VOC".to_string(), 120.0),
        ]);
        let [_, explosion, gas_leak] = derive_targets(&values, &default_limits());
        assert!((explosion - 1.0).abs() < 1e-6);
        assert!((gas_leak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn jsonl_loading_reports_malformed_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"date":"2024-01-05","city":"Chicago","values":{{"Methane":4100.0}}}}"#
        )
        .unwrap();
        writeln!(file, "not json").unwrap();
        let err = TrainingSet::load_jsonl(file.path()).unwrap_err();
        assert!(matches!(err, TrainingDataError::Parse { line: 2, .. }));
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = NamedTempFile::new().unwrap();
        let err = TrainingSet::load_jsonl(file.path()).unwrap_err();
        assert!(matches!(err, TrainingDataError::Empty));
    }

    #[test]
    fn split_is_deterministic() {
        let rows = vec![vec![0.0]; 10];
        let targets = vec![[0.0, 0.0, 0.0]; 10];
        let (train_rows, _, test_rows, _) = train_test_split(&rows, &targets, 0.2);
        assert_eq!(train_rows.len(), 8);
        assert_eq!(test_rows.len(), 2);
    }
}

use chrono::{DateTime, Datelike, Utc};

use crate::reading::SensorReading;

use super::{encoder::CityEncoder, FeatureAlignmentError, CITY_COLUMN};

/// Result of feature assembly, carrying the degraded-mode marker.
#[derive(Debug, Clone)]
pub struct BuiltFeatures {
    /// Values in declared column order.
    pub values: Vec<f32>,
    /// True when the reading's city was unknown to the encoder and code 0 was
    /// substituted. Degraded but available; callers surface the signal.
    pub city_fallback: bool,
}

/// Assembles fixed-order feature vectors for a declared schema.
///
/// Columns start at zero, reading values overwrite by name, the temporal
/// columns derive from the evaluation timestamp, and the city encodes through
/// the pre-fit encoder.
#[derive(Debug, Clone)]
pub struct FeatureBuilder<'a> {
    columns: &'a [String],
    encoder: &'a CityEncoder,
}

impl<'a> FeatureBuilder<'a> {
    /// Creates a builder over the declared column order.
    pub fn new(
        columns: &'a [String],
        encoder: &'a CityEncoder,
    ) -> Result<Self, FeatureAlignmentError> {
        if columns.is_empty() {
            return Err(FeatureAlignmentError::new(
                "declared feature column set is empty",
            ));
        }
        Ok(Self { columns, encoder })
    }

    /// Builds the feature vector for a reading at the given evaluation time.
    ///
    /// The vector length always equals the declared column count. Explosion
    /// parameters take precedence over an identically-named pollutant.
    #[must_use]
    pub fn build(&self, reading: &SensorReading, at: DateTime<Utc>) -> BuiltFeatures {
        let mut values = vec![0.0f32; self.columns.len()];
        let mut city_fallback = false;

        for (slot, column) in values.iter_mut().zip(self.columns) {
            match column.as_str() {
                "month" => *slot = at.month() as f32,
                "day" => *slot = at.day() as f32,
                "day_of_week" => *slot = at.weekday().num_days_from_monday() as f32,
                CITY_COLUMN => {
                    let code = self.encoder.transform(&reading.city).unwrap_or_else(|| {
                        city_fallback = true;
                        0
                    });
                    *slot = code as f32;
                }
                name => {
                    if let Some(value) = reading
                        .explosion_parameters
                        .get(name)
                        .or_else(|| reading.pollutants.get(name))
                    {
                        *slot = *value;
                    }
                }
            }
        }

        BuiltFeatures {
            values,
            city_fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use indexmap::IndexMap;

    fn schema() -> Vec<String> {
        [
            "Carbon Monoxide",
            "Methane",
            "month",
            "day",
            "day_of_week",
            CITY_COLUMN,
        ]
        .iter()
        .map(|name| (*name).to_string())
        .collect()
    }

    fn reading(city: &str) -> SensorReading {
        SensorReading {
            city: city.to_string(),
            pollutants: IndexMap::from([("Carbon Monoxide".to_string(), 2.5)]),
            explosion_parameters: IndexMap::from([("Methane".to_string(), 4500.0)]),
        }
    }

    #[test]
    fn vector_matches_declared_order() {
        let columns = schema();
        let encoder = CityEncoder::fit(["Kharkiv", "Lviv"]);
        let builder = FeatureBuilder::new(&columns, &encoder).unwrap();
        // 2024-03-07 was a Thursday.
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let built = builder.build(&reading("Lviv"), at);
        assert_eq!(built.values.len(), columns.len());
        assert!((built.values[0] - 2.5).abs() < f32::EPSILON);
        assert!((built.values[1] - 4500.0).abs() < f32::EPSILON);
        assert!((built.values[2] - 3.0).abs() < f32::EPSILON);
        assert!((built.values[3] - 7.0).abs() < f32::EPSILON);
        assert!((built.values[4] - 3.0).abs() < f32::EPSILON);
        assert!((built.values[5] - 1.0).abs() < f32::EPSILON);
        assert!(!built.city_fallback);
    }

    #[test]
    fn missing_parameters_fill_as_zero() {
        let columns = schema();
        let encoder = CityEncoder::fit(["Kharkiv"]);
        let builder = FeatureBuilder::new(&columns, &encoder).unwrap();
        let empty = SensorReading {
            city: "Kharkiv".to_string(),
            pollutants: IndexMap::new(),
            explosion_parameters: IndexMap::new(),
        };
        let built = builder.build(&empty, Utc::now());
        assert!(built.values[0].abs() < f32::EPSILON);
        assert!(built.values[1].abs() < f32::EPSILON);
    }

    #[test]
    fn unseen_city_falls_back_to_zero_with_signal() {
        let columns = schema();
        let encoder = CityEncoder::fit(["Kharkiv"]);
        let builder = FeatureBuilder::new(&columns, &encoder).unwrap();
        let built = builder.build(&reading("Atlantis"), Utc::now());
        assert!(built.city_fallback);
        assert!(built.values[5].abs() < f32::EPSILON);
    }

    #[test]
    fn empty_schema_is_rejected() {
        let encoder = CityEncoder::default();
        assert!(FeatureBuilder::new(&[], &encoder).is_err());
    }
}

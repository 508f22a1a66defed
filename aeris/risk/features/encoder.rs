use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Label encoder mapping city names to integer codes.
///
/// Codes are assigned over the sorted distinct training cities. Cities unseen
/// at fit time are handled by the feature builder, which substitutes code 0
/// instead of failing the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityEncoder {
    classes: IndexMap<String, u32>,
}

impl CityEncoder {
    /// Fits the encoder over the distinct city names.
    #[must_use]
    pub fn fit<I, S>(cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = cities.into_iter().map(Into::into).collect();
        names.sort();
        names.dedup();
        let classes = names
            .into_iter()
            .enumerate()
            .map(|(code, name)| (name, code as u32))
            .collect();
        Self { classes }
    }

    /// Code for a known city.
    #[must_use]
    pub fn transform(&self, city: &str) -> Option<u32> {
        self.classes.get(city).copied()
    }

    /// Number of distinct classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// True when no classes were fit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sorted_order() {
        let encoder = CityEncoder::fit(["Odesa", "Kharkiv", "Lviv", "Kharkiv"]);
        assert_eq!(encoder.len(), 3);
        assert_eq!(encoder.transform("Kharkiv"), Some(0));
        assert_eq!(encoder.transform("Lviv"), Some(1));
        assert_eq!(encoder.transform("Odesa"), Some(2));
    }

    #[test]
    fn unseen_city_is_none() {
        let encoder = CityEncoder::fit(["Kharkiv"]);
        assert_eq!(encoder.transform("Atlantis"), None);
    }

    #[test]
    fn round_trips_through_json() {
        let encoder = CityEncoder::fit(["Kharkiv", "Lviv"]);
        let restored: CityEncoder =
            serde_json::from_str(&serde_json::to_string(&encoder).unwrap()).unwrap();
        assert_eq!(restored, encoder);
    }
}

//! Feature construction: fixed-order vectors, categorical encoding, scaling.

/// Fixed-order feature vector assembly.
pub mod builder;
/// Categorical city encoding.
pub mod encoder;
/// Per-column mean/deviation scaling.
pub mod scaler;

use thiserror::Error;

/// Raised when the declared feature schema cannot be resolved or dimensions
/// disagree. Fatal to the request, never to the process.
#[derive(Debug, Clone, Error)]
#[error("feature alignment failed: {0}")]
pub struct FeatureAlignmentError(String);

impl FeatureAlignmentError {
    /// Creates an alignment error with the given detail.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Temporal columns appended to every feature schema, in order.
pub const TEMPORAL_COLUMNS: [&str; 3] = ["month", "day", "day_of_week"];

/// Name of the encoded-city column.
pub const CITY_COLUMN: &str = "city_encoded";

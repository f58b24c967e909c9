//! Typed views of the payloads the agents return.
//!
//! The agents define these shapes; nothing here is enforced on the remote
//! side. Identifiers are required, everything else falls back to an empty
//! or zero value when absent or `null`.

pub mod coverage;
pub mod levels;
pub mod medical;
pub mod pattern;
pub mod supply;

use serde::de::DeserializeOwned;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

pub use coverage::{AlertCreated, CoverageResult, NearbyVolunteer, UncoveredZone};
pub use levels::{RiskLevel, Urgency, ZoneStatus};
pub use medical::{DoctorNotified, MedicalResult};
pub use pattern::{
    ChronicNeglectZone, OverburdenedVolunteer, PatternResult, RiskForecast, Trends, WeeklyInsights,
};
pub use supply::{MatchedOffer, SupplyResult};

#[derive(Debug, Error)]
#[error("{shape} payload failed validation: {source}")]
pub struct DecodeError {
    pub shape: &'static str,
    source: serde_json::Error,
}

/// Validate an agent result against the expected shape.
pub fn decode<T: DeserializeOwned>(shape: &'static str, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|source| DecodeError { shape, source })
}

/// Treat an explicit `null` like a missing field.
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Counts arrive as JSON numbers, sometimes as `14.0`. Missing or `null`
/// is zero; fractions are rounded.
pub(crate) fn count_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(0),
        Some(n) if n.is_finite() && n >= 0.0 => Ok(n.round().min(u32::MAX as f64) as u32),
        Some(n) => Err(D::Error::custom(format!("expected a non-negative count, got {}", n))),
    }
}

use serde::{Deserialize, Serialize};

use super::levels::Urgency;
use super::null_default;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorNotified {
    pub doctor_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub distance_km: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub specialization: String,
}

/// Triage outcome for a reported injured cat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalResult {
    pub case_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub urgency: String,
    #[serde(default, deserialize_with = "null_default")]
    pub injury_type: String,
    #[serde(default, deserialize_with = "null_default")]
    pub symptoms: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub analysis: String,
    #[serde(default, deserialize_with = "null_default")]
    pub doctors_notified: Vec<DoctorNotified>,
    #[serde(default, deserialize_with = "null_default")]
    pub expected_response_time: String,
    #[serde(default, deserialize_with = "null_default")]
    pub admin_flagged: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub recommendations: Vec<String>,
}

impl MedicalResult {
    pub const SHAPE: &'static str = "medical triage";

    pub fn urgency_level(&self) -> Urgency {
        Urgency::parse(&self.urgency)
    }
}

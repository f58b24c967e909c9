use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::levels::{Urgency, ZoneStatus};
use super::{count_default, null_default};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UncoveredZone {
    pub zone_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub last_fed: String,
    #[serde(default, deserialize_with = "null_default")]
    pub urgency: String,
}

impl UncoveredZone {
    pub fn urgency_level(&self) -> Urgency {
        Urgency::parse(&self.urgency)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyVolunteer {
    pub user_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub distance_km: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub availability: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCreated {
    pub alert_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub zone_id: String,
    #[serde(default, deserialize_with = "count_default")]
    pub volunteers_notified: u32,
}

/// Reply of the coverage agent's zone scan.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CoverageResult {
    #[serde(default, deserialize_with = "null_default")]
    pub zone_status: String,
    #[serde(default, deserialize_with = "null_default")]
    pub uncovered_zones: Vec<UncoveredZone>,
    #[serde(default, deserialize_with = "null_default")]
    pub nearby_volunteers: Vec<NearbyVolunteer>,
    #[serde(default, deserialize_with = "null_default")]
    pub alerts_created: Vec<AlertCreated>,
    #[serde(default, deserialize_with = "null_default")]
    pub escalations: Vec<Value>,
}

impl CoverageResult {
    pub const SHAPE: &'static str = "coverage";

    pub fn status(&self) -> ZoneStatus {
        ZoneStatus::parse(&self.zone_status)
    }

    /// Uncovered zones, most urgent first.
    pub fn zones_by_urgency(&self) -> Vec<&UncoveredZone> {
        let mut zones: Vec<&UncoveredZone> = self.uncovered_zones.iter().collect();
        zones.sort_by(|a, b| b.urgency_level().cmp(&a.urgency_level()));
        zones
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decode;
    use serde_json::json;

    #[test]
    fn decodes_partial_scan_with_defaults() {
        let cov: CoverageResult = decode(
            CoverageResult::SHAPE,
            json!({
                "zone_status": "ok",
                "uncovered_zones": [{"zone_id": "Z3", "last_fed": "26h ago", "urgency": "high"}],
                "escalations": null
            }),
        )
        .unwrap();
        assert_eq!(cov.uncovered_zones[0].zone_id, "Z3");
        assert!(cov.nearby_volunteers.is_empty());
        assert!(cov.escalations.is_empty());
    }

    #[test]
    fn zone_without_id_is_rejected() {
        let err = decode::<CoverageResult>(
            CoverageResult::SHAPE,
            json!({"uncovered_zones": [{"last_fed": "2h ago"}]}),
        )
        .unwrap_err();
        assert_eq!(err.shape, "coverage");
        assert!(err.to_string().contains("zone_id"));
    }

    #[test]
    fn wrong_type_is_rejected() {
        assert!(decode::<CoverageResult>(
            CoverageResult::SHAPE,
            json!({"uncovered_zones": "none"})
        )
        .is_err());
    }

    #[test]
    fn sorts_zones_by_urgency() {
        let cov = CoverageResult {
            uncovered_zones: vec![
                UncoveredZone {
                    zone_id: "Z1".into(),
                    last_fed: String::new(),
                    urgency: "low".into(),
                },
                UncoveredZone {
                    zone_id: "Z2".into(),
                    last_fed: String::new(),
                    urgency: "critical".into(),
                },
                UncoveredZone {
                    zone_id: "Z3".into(),
                    last_fed: String::new(),
                    urgency: "medium".into(),
                },
            ],
            ..Default::default()
        };
        let order: Vec<&str> = cov
            .zones_by_urgency()
            .iter()
            .map(|z| z.zone_id.as_str())
            .collect();
        assert_eq!(order, ["Z2", "Z3", "Z1"]);
    }
}

use serde::{Deserialize, Serialize};

use super::levels::RiskLevel;
use super::{count_default, null_default};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChronicNeglectZone {
    pub zone_id: String,
    #[serde(default, deserialize_with = "count_default")]
    pub missed_days_last_month: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskForecast {
    pub zone_id: String,
    #[serde(default, deserialize_with = "null_default")]
    pub risk_level: String,
    #[serde(default, deserialize_with = "null_default")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub recommended_action: String,
}

impl RiskForecast {
    pub fn level(&self) -> RiskLevel {
        RiskLevel::parse(&self.risk_level)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverburdenedVolunteer {
    pub user_id: String,
    #[serde(default, deserialize_with = "count_default")]
    pub zones_assigned: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub burnout_risk: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeeklyInsights {
    #[serde(default, deserialize_with = "null_default")]
    pub coverage_percentage: f64,
    #[serde(default, deserialize_with = "count_default")]
    pub total_check_ins: u32,
    #[serde(default, deserialize_with = "count_default")]
    pub medical_cases: u32,
    #[serde(default, deserialize_with = "count_default")]
    pub volunteer_count: u32,
    #[serde(default, deserialize_with = "null_default")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Trends {
    #[serde(default, deserialize_with = "null_default")]
    pub volunteer_growth: String,
    #[serde(default, deserialize_with = "null_default")]
    pub medical_hotspots: Vec<String>,
    /// Fraction in `[0, 1]`.
    #[serde(default, deserialize_with = "null_default")]
    pub offer_redemption_rate: f64,
}

/// Reply of the pattern and forecasting agent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternResult {
    #[serde(default, deserialize_with = "null_default")]
    pub chronic_neglect_zones: Vec<ChronicNeglectZone>,
    #[serde(default, deserialize_with = "null_default")]
    pub risk_forecast_tomorrow: Vec<RiskForecast>,
    #[serde(default, deserialize_with = "null_default")]
    pub overburdened_volunteers: Vec<OverburdenedVolunteer>,
    #[serde(default, deserialize_with = "null_default")]
    pub weekly_insights: WeeklyInsights,
    #[serde(default, deserialize_with = "null_default")]
    pub trends: Trends,
}

impl PatternResult {
    pub const SHAPE: &'static str = "pattern forecast";

    pub fn high_risk_zones(&self) -> impl Iterator<Item = &RiskForecast> {
        self.risk_forecast_tomorrow
            .iter()
            .filter(|f| f.level() == RiskLevel::High)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decode;
    use serde_json::json;

    #[test]
    fn decodes_forecast_with_missing_sections() {
        let pattern: PatternResult = decode(
            PatternResult::SHAPE,
            json!({
                "risk_forecast_tomorrow": [
                    {"zone_id": "Z1", "risk_level": "High", "confidence": 0.8},
                    {"zone_id": "Z2", "risk_level": "low", "confidence": 0.4}
                ],
                "weekly_insights": {"coverage_percentage": 78.5, "volunteer_count": 12}
            }),
        )
        .unwrap();
        assert_eq!(pattern.high_risk_zones().count(), 1);
        assert_eq!(pattern.weekly_insights.volunteer_count, 12);
        assert!(pattern.weekly_insights.recommendations.is_empty());
        assert_eq!(pattern.trends, Trends::default());
    }

    #[test]
    fn counts_accept_float_encoded_numbers() {
        let pattern: PatternResult = decode(
            PatternResult::SHAPE,
            json!({
                "weekly_insights": {"volunteer_count": 14.0, "medical_cases": null, "total_check_ins": 96},
                "overburdened_volunteers": [{"user_id": "V7", "zones_assigned": 4.0}]
            }),
        )
        .unwrap();
        assert_eq!(pattern.weekly_insights.volunteer_count, 14);
        assert_eq!(pattern.weekly_insights.medical_cases, 0);
        assert_eq!(pattern.overburdened_volunteers[0].zones_assigned, 4);

        assert!(decode::<PatternResult>(
            PatternResult::SHAPE,
            json!({"weekly_insights": {"volunteer_count": -3}})
        )
        .is_err());
    }
}

use serde::{Deserialize, Serialize};

/// Severity the triage and coverage agents attach to cases and zones.
///
/// Variants are declared from least to most severe so the derived ordering
/// sorts by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Urgency {
    Unknown,
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CRITICAL" => Urgency::Critical,
            "HIGH" => Urgency::High,
            "MEDIUM" => Urgency::Medium,
            "LOW" => Urgency::Low,
            _ => Urgency::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Unknown,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            "low" => RiskLevel::Low,
            _ => RiskLevel::Unknown,
        }
    }
}

/// Traffic-light status of the whole zone network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    Green,
    Amber,
    Red,
    Unknown,
}

impl ZoneStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "green" => ZoneStatus::Green,
            "amber" => ZoneStatus::Amber,
            "red" => ZoneStatus::Red,
            _ => ZoneStatus::Unknown,
        }
    }
}

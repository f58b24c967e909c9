use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{require_text, AgentContext, ServiceError};
use crate::config::Capability;
use crate::domain::{CoverageResult, Urgency};

pub const COVERAGE_SCAN_INSTRUCTION: &str =
    "Scan all zones and identify any that haven't been fed in the last 24 hours";

/// Headline numbers on the feeder dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeederStats {
    pub zones_fed_today: usize,
    pub uncovered_zones: usize,
    pub urgent_zones: usize,
    pub nearby_alerts: usize,
}

impl FeederStats {
    pub fn from_coverage(coverage: &CoverageResult, total_zones: usize) -> Self {
        let uncovered = coverage.uncovered_zones.len();
        Self {
            zones_fed_today: total_zones.saturating_sub(uncovered),
            uncovered_zones: uncovered,
            urgent_zones: coverage
                .uncovered_zones
                .iter()
                .filter(|z| z.urgency_level() >= Urgency::High)
                .count(),
            nearby_alerts: coverage.alerts_created.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckInReceipt {
    pub location: String,
    pub checked_in_at: DateTime<Local>,
    pub acknowledgement: Value,
}

#[derive(Clone)]
pub struct HomeService {
    ctx: AgentContext,
}

impl HomeService {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn scan_coverage(&self) -> Result<CoverageResult, ServiceError> {
        self.ctx
            .ask(Capability::Coverage, COVERAGE_SCAN_INSTRUCTION, CoverageResult::SHAPE)
            .await
    }

    pub async fn check_in(
        &self,
        location: &str,
        at: DateTime<Local>,
    ) -> Result<CheckInReceipt, ServiceError> {
        let location = require_text(location, "Please provide a check-in location")?;
        let instruction = format!(
            "Volunteer check-in for {} at {}",
            location,
            at.format("%H:%M:%S")
        );
        let acknowledgement = self.ctx.ask_raw(Capability::Orchestrator, &instruction).await?;
        info!("Volunteer checked in at {}", location);
        Ok(CheckInReceipt {
            location: location.to_string(),
            checked_in_at: at,
            acknowledgement,
        })
    }

    pub async fn accept_zone(&self, zone_id: &str) -> Result<Value, ServiceError> {
        let zone_id = require_text(zone_id, "Please provide a zone id")?;
        let instruction = format!("Volunteer accepting coverage for {}", zone_id);
        let acknowledgement = self.ctx.ask_raw(Capability::Orchestrator, &instruction).await?;
        info!("Volunteer accepted coverage for {}", zone_id);
        Ok(acknowledgement)
    }
}

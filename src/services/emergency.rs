use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::doctor::{CaseBoard, MedicalCase};
use super::{AgentContext, ServiceError};
use crate::config::Capability;
use crate::domain::MedicalResult;

const MISSING_FIELDS: &str = "Please provide both description and location";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmergencyReport {
    pub description: String,
    pub location: String,
}

impl EmergencyReport {
    fn instruction(description: &str, location: &str) -> String {
        format!(
            "A cat was found with {}. Location: {}. Classify urgency, create case ticket, and notify nearest available doctors.",
            description, location
        )
    }
}

/// Sends injured-cat reports to the triage agent and files the resulting case.
#[derive(Clone)]
pub struct EmergencyService {
    ctx: AgentContext,
    cases: Arc<CaseBoard>,
}

impl EmergencyService {
    pub fn new(ctx: AgentContext, cases: Arc<CaseBoard>) -> Self {
        Self { ctx, cases }
    }

    pub async fn report(&self, report: &EmergencyReport) -> Result<MedicalCase, ServiceError> {
        let description = report.description.trim();
        let location = report.location.trim();
        if description.is_empty() || location.is_empty() {
            return Err(ServiceError::InvalidInput(MISSING_FIELDS.to_string()));
        }

        let instruction = EmergencyReport::instruction(description, location);
        let result: MedicalResult = self
            .ctx
            .ask(Capability::MedicalTriage, &instruction, MedicalResult::SHAPE)
            .await?;
        info!(
            "Triage created case {} with urgency {:?}",
            result.case_id,
            result.urgency_level()
        );
        Ok(self.cases.register(result, location))
    }
}

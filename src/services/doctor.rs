use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{AgentContext, ServiceError};
use crate::config::Capability;
use crate::domain::{MedicalResult, SupplyResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaseStatus {
    Pending,
    Accepted,
    InProgress,
    Completed,
}

impl CaseStatus {
    fn can_move_to(self, next: CaseStatus) -> bool {
        matches!(
            (self, next),
            (CaseStatus::Pending, CaseStatus::Accepted)
                | (CaseStatus::Accepted, CaseStatus::InProgress)
                | (CaseStatus::Accepted, CaseStatus::Completed)
                | (CaseStatus::InProgress, CaseStatus::Completed)
        )
    }
}

/// A triaged case as shown on the doctor portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedicalCase {
    #[serde(flatten)]
    pub result: MedicalResult,
    pub location: String,
    pub status: CaseStatus,
    pub reported_at: DateTime<Utc>,
}

/// Cases reported during this process's lifetime, keyed by case id.
#[derive(Default)]
pub struct CaseBoard {
    cases: DashMap<String, MedicalCase>,
}

impl CaseBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, result: MedicalResult, location: &str) -> MedicalCase {
        let case = MedicalCase {
            result,
            location: location.to_string(),
            status: CaseStatus::Pending,
            reported_at: Utc::now(),
        };
        let case_id = case.result.case_id.clone();
        if self.cases.insert(case_id.clone(), case.clone()).is_some() {
            warn!("Case {} was reported again, replacing it", case_id);
        } else {
            info!("Registered case {} ({})", case_id, case.result.urgency);
        }
        case
    }

    pub fn get(&self, case_id: &str) -> Option<MedicalCase> {
        self.cases.get(case_id).map(|c| c.value().clone())
    }

    /// Cases, most urgent first, oldest first within the same urgency.
    pub fn list(&self, status: Option<CaseStatus>) -> Vec<MedicalCase> {
        let mut cases: Vec<MedicalCase> = self
            .cases
            .iter()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .map(|c| c.value().clone())
            .collect();
        cases.sort_by(|a, b| {
            b.result
                .urgency_level()
                .cmp(&a.result.urgency_level())
                .then(a.reported_at.cmp(&b.reported_at))
        });
        cases
    }

    pub fn accept(&self, case_id: &str) -> Result<MedicalCase, ServiceError> {
        self.transition(case_id, CaseStatus::Accepted)
    }

    pub fn start(&self, case_id: &str) -> Result<MedicalCase, ServiceError> {
        self.transition(case_id, CaseStatus::InProgress)
    }

    pub fn complete(&self, case_id: &str) -> Result<MedicalCase, ServiceError> {
        self.transition(case_id, CaseStatus::Completed)
    }

    pub fn reject(&self, case_id: &str) -> Result<MedicalCase, ServiceError> {
        let (_, case) = self
            .cases
            .remove(case_id)
            .ok_or_else(|| ServiceError::NotFound(format!("case {}", case_id)))?;
        info!("Rejected case {}", case_id);
        Ok(case)
    }

    fn transition(&self, case_id: &str, next: CaseStatus) -> Result<MedicalCase, ServiceError> {
        let mut case = self
            .cases
            .get_mut(case_id)
            .ok_or_else(|| ServiceError::NotFound(format!("case {}", case_id)))?;
        if !case.status.can_move_to(next) {
            return Err(ServiceError::InvalidInput(format!(
                "case {} cannot move from {:?} to {:?}",
                case_id, case.status, next
            )));
        }
        case.status = next;
        info!("Case {} is now {:?}", case_id, next);
        Ok(case.value().clone())
    }
}

#[derive(Clone)]
pub struct DoctorService {
    ctx: AgentContext,
}

impl DoctorService {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    /// Ask the supply matching agent for vendor offers relevant to a case.
    pub async fn match_offers(&self, case: &MedicalCase) -> Result<SupplyResult, ServiceError> {
        let location = if case.location.trim().is_empty() {
            "an unknown location"
        } else {
            case.location.as_str()
        };
        let instruction = format!(
            "A medical case for {} treatment has been created at location {}. Match with relevant vendor offers.",
            case.result.injury_type, location
        );
        self.ctx
            .ask(Capability::SupplyMatching, &instruction, SupplyResult::SHAPE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{registry, ScriptedInvoker};
    use serde_json::json;
    use std::sync::Arc;

    fn triage(case_id: &str, urgency: &str) -> MedicalResult {
        serde_json::from_value(json!({
            "case_id": case_id,
            "urgency": urgency,
            "injury_type": "wound"
        }))
        .unwrap()
    }

    #[test]
    fn lists_most_urgent_first_and_filters() {
        let board = CaseBoard::new();
        board.register(triage("MC-1", "MEDIUM"), "Zone B");
        board.register(triage("MC-2", "CRITICAL"), "Zone A");
        board.register(triage("MC-3", "LOW"), "Zone C");
        board.accept("MC-3").unwrap();

        let ids: Vec<String> = board.list(None).into_iter().map(|c| c.result.case_id).collect();
        assert_eq!(ids, ["MC-2", "MC-1", "MC-3"]);
        assert_eq!(board.list(Some(CaseStatus::Accepted)).len(), 1);
        assert_eq!(board.list(Some(CaseStatus::Pending)).len(), 2);
    }

    #[test]
    fn enforces_status_transitions() {
        let board = CaseBoard::new();
        board.register(triage("MC-1", "HIGH"), "Zone B");

        assert!(matches!(board.complete("MC-1"), Err(ServiceError::InvalidInput(_))));
        assert_eq!(board.accept("MC-1").unwrap().status, CaseStatus::Accepted);
        assert_eq!(board.start("MC-1").unwrap().status, CaseStatus::InProgress);
        assert_eq!(board.complete("MC-1").unwrap().status, CaseStatus::Completed);
        assert!(matches!(board.accept("MC-1"), Err(ServiceError::InvalidInput(_))));
        assert!(matches!(board.accept("MC-9"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn reject_removes_case() {
        let board = CaseBoard::new();
        board.register(triage("MC-1", "HIGH"), "Zone B");
        board.reject("MC-1").unwrap();
        assert!(board.get("MC-1").is_none());
        assert!(matches!(board.reject("MC-1"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn case_serializes_flat_with_kebab_status() {
        let board = CaseBoard::new();
        board.register(triage("MC-1", "HIGH"), "Zone B");
        board.accept("MC-1").unwrap();
        let case = board.start("MC-1").unwrap();
        let value = serde_json::to_value(case).unwrap();
        assert_eq!(value["case_id"], json!("MC-1"));
        assert_eq!(value["status"], json!("in-progress"));
        assert_eq!(value["location"], json!("Zone B"));
    }

    #[tokio::test]
    async fn match_offers_describes_case() {
        let invoker = Arc::new(ScriptedInvoker::default().reply(
            "supply",
            Ok(json!({"matched_offers": [{"offer_id": "offer123", "distance_km": 4.5}]})),
        ));
        let service = DoctorService::new(AgentContext::new(invoker.clone(), registry()));
        let board = CaseBoard::new();
        let case = board.register(triage("MC-1", "HIGH"), "Zone C, 19.0760, 72.8777");

        let supply = service.match_offers(&case).await.unwrap();
        assert_eq!(supply.matched_offers[0].offer_id, "offer123");
        assert_eq!(
            invoker.calls()[0].1,
            "A medical case for wound treatment has been created at location Zone C, 19.0760, 72.8777. Match with relevant vendor offers."
        );
    }
}

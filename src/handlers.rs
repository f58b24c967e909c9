use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Capability;
use crate::domain::SupplyResult;
use crate::gateway::{AgentEnvelope, AgentFailure};
use crate::services::doctor::{CaseStatus, MedicalCase};
use crate::services::emergency::EmergencyReport;
use crate::services::vendor::{ActiveOffer, OfferDraft};
use crate::services::ServiceError;
use crate::state::{AppState, CoverageSnapshot, COVERAGE_SLOT};

const CLIENT_HEADER: &str = "x-client-id";

/// Error body shared by every endpoint:
/// `{"success": false, "error": {"kind": ..., "message": ...}}`.
pub struct ApiError(ServiceError);

impl<E> From<E> for ApiError
where
    E: Into<ServiceError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Superseded(_) => StatusCode::CONFLICT,
            ServiceError::Agent(AgentFailure::RemoteRejected { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Agent(_) | ServiceError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }
        let body = Json(json!({
            "success": false,
            "error": {
                "kind": self.0.kind(),
                "message": self.0.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("anonymous")
        .to_string()
}

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn list_agents(State(state): State<AppState>) -> Json<Value> {
    let agents: serde_json::Map<String, Value> = Capability::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), json!(state.agents.agents().agent_id(*c))))
        .collect();
    Json(Value::Object(agents))
}

#[derive(Debug, Deserialize)]
pub struct InvokeBody {
    pub instruction: String,
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default)]
    pub capability: Option<Capability>,
}

/// Pass-through to the gateway: always answers with the envelope.
pub async fn invoke_agent(
    State(state): State<AppState>,
    Json(body): Json<InvokeBody>,
) -> Result<Json<AgentEnvelope>, ApiError> {
    if body.instruction.trim().is_empty() {
        return Err(ServiceError::InvalidInput("instruction is required".to_string()).into());
    }
    let agent_id = match (&body.agent_id, body.capability) {
        (Some(id), None) if !id.trim().is_empty() => id.trim().to_string(),
        (None, Some(capability)) => state.agents.agents().agent_id(capability).to_string(),
        _ => {
            return Err(ServiceError::InvalidInput(
                "exactly one of agent_id or capability is required".to_string(),
            )
            .into())
        }
    };
    let envelope = state.agents.invoker().invoke(&body.instruction, &agent_id).await;
    Ok(Json(envelope))
}

/// Scan coverage for one client and offer the result to the shared snapshot.
///
/// A newer scan from the same client aborts this one; a scan that finishes
/// after a newer one was issued by anyone is not applied to the snapshot.
pub async fn refresh_coverage(
    state: &AppState,
    client: &str,
) -> Result<CoverageSnapshot, ServiceError> {
    let shared_ticket = state.sequencer.issue(COVERAGE_SLOT);
    let home = state.home.clone();
    let slot = format!("{}:{}", COVERAGE_SLOT, client);
    let coverage = state
        .sequencer
        .run_latest(&slot, async move { home.scan_coverage().await })
        .await?;

    let snapshot = CoverageSnapshot::new(coverage?, state.config.system_config.total_zones);
    if !state
        .latest_coverage
        .apply(&state.sequencer, &shared_ticket, snapshot.clone())
        .await
    {
        debug!("Coverage scan for {} finished after a newer one", client);
    }
    Ok(snapshot)
}

fn spawn_coverage_refresh(state: AppState, client: String) {
    tokio::spawn(async move {
        if let Err(e) = refresh_coverage(&state, &client).await {
            warn!("Background coverage refresh failed: {}", e);
        }
    });
}

pub async fn home_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CoverageSnapshot>, ApiError> {
    let snapshot = refresh_coverage(&state, &client_id(&headers)).await?;
    Ok(Json(snapshot))
}

pub async fn latest_coverage(
    State(state): State<AppState>,
) -> Result<Json<CoverageSnapshot>, ApiError> {
    state
        .latest_coverage
        .get()
        .await
        .map(Json)
        .ok_or_else(|| ServiceError::NotFound("coverage snapshot".to_string()).into())
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    #[serde(default)]
    pub location: String,
}

pub async fn check_in(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CheckInBody>,
) -> Result<Json<Value>, ApiError> {
    let receipt = state.home.check_in(&body.location, Local::now()).await?;
    spawn_coverage_refresh(state, client_id(&headers));
    Ok(Json(json!({ "success": true, "check_in": receipt })))
}

pub async fn volunteer_for_zone(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(zone_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let acknowledgement = state.home.accept_zone(&zone_id).await?;
    spawn_coverage_refresh(state, client_id(&headers));
    Ok(Json(json!({
        "success": true,
        "zone_id": zone_id,
        "acknowledgement": acknowledgement
    })))
}

pub async fn report_emergency(
    State(state): State<AppState>,
    Json(report): Json<EmergencyReport>,
) -> Result<(StatusCode, Json<MedicalCase>), ApiError> {
    let case = state.emergency.report(&report).await?;
    Ok((StatusCode::CREATED, Json(case)))
}

#[derive(Debug, Deserialize)]
pub struct CaseQuery {
    #[serde(default)]
    pub status: Option<CaseStatus>,
}

pub async fn list_cases(
    State(state): State<AppState>,
    Query(query): Query<CaseQuery>,
) -> Json<Vec<MedicalCase>> {
    Json(state.cases.list(query.status))
}

pub async fn accept_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<MedicalCase>, ApiError> {
    Ok(Json(state.cases.accept(&case_id)?))
}

pub async fn start_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<MedicalCase>, ApiError> {
    Ok(Json(state.cases.start(&case_id)?))
}

pub async fn complete_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<MedicalCase>, ApiError> {
    Ok(Json(state.cases.complete(&case_id)?))
}

pub async fn reject_case(
    State(state): State<AppState>,
    Path(case_id): Path<String>,
) -> Result<Json<MedicalCase>, ApiError> {
    Ok(Json(state.cases.reject(&case_id)?))
}

pub async fn case_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(case_id): Path<String>,
) -> Result<Json<SupplyResult>, ApiError> {
    let case = state
        .cases
        .get(&case_id)
        .ok_or_else(|| ServiceError::NotFound(format!("case {}", case_id)))?;

    let doctor = state.doctor.clone();
    let slot = format!("offers:{}", client_id(&headers));
    let supply = state
        .sequencer
        .run_latest(&slot, async move { doctor.match_offers(&case).await })
        .await?;
    let supply = supply?;
    Ok(Json(SupplyResult {
        matched_offers: supply.nearest_offers(),
        ..supply
    }))
}

pub async fn admin_dashboard(State(state): State<AppState>) -> Json<Value> {
    let snapshot = state.admin.load_dashboard().await;
    Json(json!({
        "success": snapshot.errors.is_empty(),
        "dashboard": snapshot
    }))
}

pub async fn list_offers(State(state): State<AppState>) -> Json<Vec<ActiveOffer>> {
    Json(state.offers.list().await)
}

pub async fn publish_offer(
    State(state): State<AppState>,
    Json(draft): Json<OfferDraft>,
) -> Result<(StatusCode, Json<ActiveOffer>), ApiError> {
    let offer = state.offers.publish(&draft).await?;
    Ok((StatusCode::CREATED, Json(offer)))
}

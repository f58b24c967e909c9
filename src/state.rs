use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::Config;
use crate::domain::{CoverageResult, UncoveredZone, ZoneStatus};
use crate::gateway::{AgentGateway, AgentInvoker, LatestSlot, SlotSequencer};
use crate::services::admin::AdminService;
use crate::services::doctor::{CaseBoard, DoctorService};
use crate::services::emergency::EmergencyService;
use crate::services::home::{FeederStats, HomeService};
use crate::services::vendor::OfferBoard;
use crate::services::AgentContext;

/// Slot shared by every view that shows zone coverage.
pub const COVERAGE_SLOT: &str = "coverage";

#[derive(Debug, Clone, Serialize)]
pub struct CoverageSnapshot {
    pub coverage: CoverageResult,
    pub zone_status: ZoneStatus,
    /// Uncovered zones, most urgent first.
    pub priority_zones: Vec<UncoveredZone>,
    pub stats: FeederStats,
    pub fetched_at: DateTime<Utc>,
}

impl CoverageSnapshot {
    pub fn new(coverage: CoverageResult, total_zones: usize) -> Self {
        Self {
            stats: FeederStats::from_coverage(&coverage, total_zones),
            zone_status: coverage.status(),
            priority_zones: coverage.zones_by_urgency().into_iter().cloned().collect(),
            coverage,
            fetched_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub agents: AgentContext,
    pub home: HomeService,
    pub emergency: EmergencyService,
    pub doctor: DoctorService,
    pub admin: AdminService,
    pub cases: Arc<CaseBoard>,
    pub offers: Arc<OfferBoard>,
    pub sequencer: Arc<SlotSequencer>,
    pub latest_coverage: Arc<LatestSlot<CoverageSnapshot>>,
}

impl AppState {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let gateway = AgentGateway::new(config.gateway_config.clone())?;
        tracing::info!("Agent endpoint: {}", gateway.endpoint());
        Ok(Self::with_invoker(config, Arc::new(gateway)))
    }

    pub fn with_invoker(config: Config, invoker: Arc<dyn AgentInvoker>) -> Self {
        let agents = AgentContext::new(invoker, config.agents.clone());
        let cases = Arc::new(CaseBoard::new());

        Self {
            home: HomeService::new(agents.clone()),
            emergency: EmergencyService::new(agents.clone(), cases.clone()),
            doctor: DoctorService::new(agents.clone()),
            admin: AdminService::new(agents.clone()),
            agents,
            cases,
            offers: Arc::new(OfferBoard::new()),
            sequencer: Arc::new(SlotSequencer::new()),
            latest_coverage: Arc::new(LatestSlot::new()),
            config,
        }
    }
}

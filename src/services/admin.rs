use serde::Serialize;
use tracing::warn;

use super::{AgentContext, ServiceError};
use crate::config::Capability;
use crate::domain::{CoverageResult, PatternResult};

pub const COVERAGE_STATUS_INSTRUCTION: &str = "Scan all zones and provide current coverage status";
pub const PATTERN_ANALYSIS_INSTRUCTION: &str =
    "Analyze the last 30 days of zone coverage data and predict risk areas";

#[derive(Debug, Clone, Serialize)]
pub struct SectionError {
    pub kind: &'static str,
    pub message: String,
}

impl From<&ServiceError> for SectionError {
    fn from(err: &ServiceError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub active_feeders: u32,
    pub coverage_percentage: f64,
    pub medical_cases: u32,
    pub total_check_ins: u32,
    pub uncovered_zones: usize,
    pub high_risk_zones: usize,
    /// Whole percent.
    pub offer_redemption_rate: u32,
}

impl DashboardMetrics {
    pub fn compute(coverage: Option<&CoverageResult>, pattern: Option<&PatternResult>) -> Self {
        let insights = pattern.map(|p| &p.weekly_insights);
        Self {
            active_feeders: insights.map_or(0, |i| i.volunteer_count),
            coverage_percentage: insights.map_or(0.0, |i| i.coverage_percentage),
            medical_cases: insights.map_or(0, |i| i.medical_cases),
            total_check_ins: insights.map_or(0, |i| i.total_check_ins),
            uncovered_zones: coverage.map_or(0, |c| c.uncovered_zones.len()),
            high_risk_zones: pattern.map_or(0, |p| p.high_risk_zones().count()),
            offer_redemption_rate: pattern.map_or(0, |p| {
                (p.trends.offer_redemption_rate * 100.0).round().max(0.0) as u32
            }),
        }
    }
}

/// Everything the admin dashboard shows. Each half is loaded independently;
/// a failed half leaves its field empty and records why.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub coverage: Option<CoverageResult>,
    pub pattern: Option<PatternResult>,
    pub metrics: DashboardMetrics,
    pub errors: Vec<SectionError>,
}

#[derive(Clone)]
pub struct AdminService {
    ctx: AgentContext,
}

impl AdminService {
    pub fn new(ctx: AgentContext) -> Self {
        Self { ctx }
    }

    pub async fn load_dashboard(&self) -> DashboardSnapshot {
        let (coverage, pattern) = futures::join!(
            self.ctx.ask::<CoverageResult>(
                Capability::Coverage,
                COVERAGE_STATUS_INSTRUCTION,
                CoverageResult::SHAPE,
            ),
            self.ctx.ask::<PatternResult>(
                Capability::PatternForecasting,
                PATTERN_ANALYSIS_INSTRUCTION,
                PatternResult::SHAPE,
            ),
        );

        let mut errors = Vec::new();
        let coverage = keep_ok("coverage", coverage, &mut errors);
        let pattern = keep_ok("pattern", pattern, &mut errors);
        DashboardSnapshot {
            metrics: DashboardMetrics::compute(coverage.as_ref(), pattern.as_ref()),
            coverage,
            pattern,
            errors,
        }
    }
}

fn keep_ok<T>(
    section: &str,
    outcome: Result<T, ServiceError>,
    errors: &mut Vec<SectionError>,
) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("Admin dashboard {} section failed: {}", section, err);
            errors.push(SectionError::from(&err));
            None
        }
    }
}

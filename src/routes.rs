use axum::{
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::handlers::*;
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router<AppState> {
    let system_config = &state.config.system_config;

    Router::new()
        // Health check
        .route("/api/health", get(health_check))
        .route("/api/agents", get(list_agents))
        .route("/api/agent", post(invoke_agent))

        // Volunteer home
        .route("/api/home", get(home_dashboard))
        .route("/api/coverage/latest", get(latest_coverage))
        .route("/api/home/check-in", post(check_in))
        .route("/api/home/zones/:zone_id/volunteer", post(volunteer_for_zone))

        // Emergency and doctor views
        .route("/api/emergency", post(report_emergency))
        .route("/api/doctor/cases", get(list_cases))
        .route("/api/doctor/cases/:case_id/accept", post(accept_case))
        .route("/api/doctor/cases/:case_id/start", post(start_case))
        .route("/api/doctor/cases/:case_id/complete", post(complete_case))
        .route("/api/doctor/cases/:case_id/reject", post(reject_case))
        .route("/api/doctor/cases/:case_id/offers", get(case_offers))

        // Admin and vendor views
        .route("/api/admin/dashboard", get(admin_dashboard))
        .route("/api/vendor/offers", get(list_offers).post(publish_offer))

        // Static frontend
        .fallback_service(ServeDir::new(&system_config.static_dir))
}

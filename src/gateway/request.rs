use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GatewayConfig;

/// Body POSTed to the agent endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    pub agent_id: String,
    pub message: String,
    pub user_id: String,
    pub session_id: String,
}

impl AgentRequest {
    pub fn new(config: &GatewayConfig, instruction: &str, agent_id: &str) -> Self {
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        Self {
            agent_id: agent_id.to_string(),
            message: instruction.to_string(),
            user_id: config.user_id.clone(),
            session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway_config(session_id: Option<&str>) -> GatewayConfig {
        serde_json::from_value(serde_json::json!({
            "base_url": "http://agents.local",
            "session_id": session_id,
        }))
        .unwrap()
    }

    #[test]
    fn fresh_session_per_request() {
        let config = gateway_config(None);
        let a = AgentRequest::new(&config, "Scan all zones", "agent-1");
        let b = AgentRequest::new(&config, "Scan all zones", "agent-1");
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.agent_id, "agent-1");
        assert_eq!(a.message, "Scan all zones");
        assert_eq!(a.user_id, "catcare-web");
    }

    #[test]
    fn pinned_session_is_reused() {
        let config = gateway_config(Some("sess-42"));
        let req = AgentRequest::new(&config, "hi", "agent-1");
        assert_eq!(req.session_id, "sess-42");
    }
}

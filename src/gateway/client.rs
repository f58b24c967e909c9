use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::envelope::{AgentEnvelope, AgentFailure};
use super::interface::AgentInvoker;
use super::normalize::normalize_body;
use super::request::AgentRequest;
use crate::config::GatewayConfig;

const BODY_EXCERPT_LEN: usize = 200;

/// HTTP client for the remote agent endpoint.
#[derive(Debug, Clone)]
pub struct AgentGateway {
    client: Client,
    endpoint: String,
    config: GatewayConfig,
}

impl AgentGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint_url(),
            config,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &AgentRequest) -> Result<Vec<u8>, AgentFailure> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.header("x-api-key", key);
        }

        let response = builder.send().await.map_err(|e| AgentFailure::Network {
            http_status: e.status().map(|s| s.as_u16()),
            message: transport_message(&e),
        })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| AgentFailure::Network {
            http_status: Some(status.as_u16()),
            message: format!("failed to read reply body: {}", e),
        })?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let excerpt: String = text.trim().chars().take(BODY_EXCERPT_LEN).collect();
            let message = if excerpt.is_empty() {
                format!("agent endpoint returned {}", status)
            } else {
                format!("agent endpoint returned {}: {}", status, excerpt)
            };
            return Err(AgentFailure::Network {
                http_status: Some(status.as_u16()),
                message,
            });
        }

        Ok(body.to_vec())
    }
}

fn transport_message(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request to agent endpoint timed out".to_string()
    } else if err.is_connect() {
        format!("could not connect to agent endpoint: {}", err)
    } else {
        err.to_string()
    }
}

#[async_trait]
impl AgentInvoker for AgentGateway {
    async fn invoke(&self, instruction: &str, agent_id: &str) -> AgentEnvelope {
        let request = AgentRequest::new(&self.config, instruction, agent_id);
        debug!(
            "Invoking agent {} (session {}, {} chars)",
            agent_id,
            request.session_id,
            instruction.len()
        );

        let outcome = match self.send(&request).await {
            Ok(body) => normalize_body(&body),
            Err(failure) => Err(failure),
        };

        match &outcome {
            Ok(_) => debug!("Agent {} replied successfully", agent_id),
            Err(failure) => warn!(
                "Agent {} call failed ({}): {}",
                agent_id,
                failure.kind(),
                failure
            ),
        }

        AgentEnvelope::from(outcome)
    }
}

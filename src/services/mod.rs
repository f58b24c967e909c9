//! Dashboard-level consumers of the agent gateway.

pub mod admin;
pub mod doctor;
pub mod emergency;
pub mod home;
pub mod vendor;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::{AgentRegistry, Capability};
use crate::domain::DecodeError;
use crate::gateway::{AgentFailure, AgentInvoker, EnvelopeError, Superseded};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Agent(#[from] AgentFailure),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Superseded(#[from] Superseded),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Agent(failure) => failure.kind(),
            ServiceError::Decode(_) => "invalid_payload",
            ServiceError::Superseded(_) => "superseded",
        }
    }
}

impl From<EnvelopeError> for ServiceError {
    fn from(err: EnvelopeError) -> Self {
        match err {
            EnvelopeError::Agent(failure) => ServiceError::Agent(failure),
            EnvelopeError::Decode(decode) => ServiceError::Decode(decode),
        }
    }
}

/// What every consumer needs: a way to reach agents and the registry saying
/// which agent serves which capability.
#[derive(Clone)]
pub struct AgentContext {
    invoker: Arc<dyn AgentInvoker>,
    agents: AgentRegistry,
}

impl AgentContext {
    pub fn new(invoker: Arc<dyn AgentInvoker>, agents: AgentRegistry) -> Self {
        Self { invoker, agents }
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn invoker(&self) -> &Arc<dyn AgentInvoker> {
        &self.invoker
    }

    /// Run `instruction` against the agent serving `capability` and decode the
    /// result as `T`.
    pub async fn ask<T: DeserializeOwned>(
        &self,
        capability: Capability,
        instruction: &str,
        shape: &'static str,
    ) -> Result<T, ServiceError> {
        let agent_id = self.agents.agent_id(capability);
        debug!("Asking {} agent: {}", capability.as_str(), instruction);
        let envelope = self.invoker.invoke(instruction, agent_id).await;
        Ok(envelope.decode(shape)?)
    }

    /// Like [`ask`](Self::ask) for replies the caller treats as opaque.
    pub async fn ask_raw(
        &self,
        capability: Capability,
        instruction: &str,
    ) -> Result<Value, ServiceError> {
        let agent_id = self.agents.agent_id(capability);
        let envelope = self.invoker.invoke(instruction, agent_id).await;
        Ok(envelope.into_result()?)
    }
}

pub(crate) fn require_text<'a>(value: &'a str, message: &str) -> Result<&'a str, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(message.to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::config::AgentRegistry;
    use crate::gateway::{AgentEnvelope, AgentFailure, AgentInvoker};

    /// Replies with canned results per agent id and records every call.
    #[derive(Default)]
    pub struct ScriptedInvoker {
        replies: Mutex<Vec<(String, Result<Value, AgentFailure>)>>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedInvoker {
        pub fn reply(self, agent_id: &str, outcome: Result<Value, AgentFailure>) -> Self {
            self.replies.lock().unwrap().push((agent_id.to_string(), outcome));
            self
        }

        pub fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AgentInvoker for ScriptedInvoker {
        async fn invoke(&self, instruction: &str, agent_id: &str) -> AgentEnvelope {
            self.calls
                .lock()
                .unwrap()
                .push((agent_id.to_string(), instruction.to_string()));
            let outcome = self
                .replies
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| id == agent_id)
                .map(|(_, outcome)| outcome.clone())
                .unwrap_or_else(|| Err(AgentFailure::malformed("no scripted reply")));
            AgentEnvelope::from(outcome)
        }
    }

    pub fn registry() -> AgentRegistry {
        AgentRegistry {
            coverage: "cov".into(),
            orchestrator: "orch".into(),
            medical_triage: "triage".into(),
            supply_matching: "supply".into(),
            pattern_forecasting: "pattern".into(),
        }
    }
}

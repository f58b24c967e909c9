use async_trait::async_trait;

use super::envelope::AgentEnvelope;

/// Anything that can run an instruction against a remote agent.
///
/// Implementations never fail past this boundary: every outcome, including
/// transport errors, comes back as an [`AgentEnvelope`].
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    /// Send `instruction` to the agent registered as `agent_id`.
    async fn invoke(&self, instruction: &str, agent_id: &str) -> AgentEnvelope;
}

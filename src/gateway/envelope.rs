use serde::de::DeserializeOwned;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::domain::DecodeError;

/// Why an invocation did not produce a result.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentFailure {
    /// Connection, timeout, body read or non-2xx reply.
    #[error("agent unreachable: {message}")]
    Network {
        #[serde(skip_serializing_if = "Option::is_none")]
        http_status: Option<u16>,
        message: String,
    },
    /// The reply was not JSON or carried no recognisable indicator.
    #[error("malformed agent reply: {reason}")]
    Malformed { reason: String },
    /// The agent answered and reported a failure.
    #[error("agent rejected the request: {}", rejection_text(.message, .remote_status))]
    RemoteRejected {
        remote_status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        detail: Value,
    },
}

fn rejection_text<'a>(message: &'a Option<String>, remote_status: &'a str) -> &'a str {
    message.as_deref().unwrap_or(remote_status)
}

impl AgentFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            AgentFailure::Network { .. } => "network",
            AgentFailure::Malformed { .. } => "malformed",
            AgentFailure::RemoteRejected { .. } => "remote_rejected",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        AgentFailure::Malformed {
            reason: reason.into(),
        }
    }
}

/// Successful agent reply: the nested result, untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentPayload {
    pub result: Value,
}

impl AgentPayload {
    pub const STATUS: &'static str = "success";
}

impl Serialize for AgentPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AgentPayload", 2)?;
        state.serialize_field("status", Self::STATUS)?;
        state.serialize_field("result", &self.result)?;
        state.end()
    }
}

/// The one shape every caller of the gateway receives.
///
/// Serializes as `{"success": bool, "response": ...}`, where `response` is
/// `{"status": "success", "result": ...}` on success and
/// `{"status": "error", "kind": ..., "error": ..., ...}` on failure.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEnvelope {
    outcome: Result<AgentPayload, AgentFailure>,
}

impl AgentEnvelope {
    pub fn success(result: Value) -> Self {
        Self {
            outcome: Ok(AgentPayload { result }),
        }
    }

    pub fn failure(failure: AgentFailure) -> Self {
        Self {
            outcome: Err(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn result(&self) -> Option<&Value> {
        self.outcome.as_ref().ok().map(|p| &p.result)
    }

    pub fn failure_reason(&self) -> Option<&AgentFailure> {
        self.outcome.as_ref().err()
    }

    pub fn into_result(self) -> Result<Value, AgentFailure> {
        self.outcome.map(|p| p.result)
    }

    /// Decode the result into a typed payload. Agent failures are passed
    /// through, shape mismatches become [`DecodeError`].
    pub fn decode<T: DeserializeOwned>(self, shape: &'static str) -> Result<T, EnvelopeError> {
        let value = self.into_result()?;
        Ok(crate::domain::decode(shape, value)?)
    }
}

impl From<Result<Value, AgentFailure>> for AgentEnvelope {
    fn from(outcome: Result<Value, AgentFailure>) -> Self {
        Self {
            outcome: outcome.map(|result| AgentPayload { result }),
        }
    }
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Agent(#[from] AgentFailure),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Serialize)]
struct FailureBody<'a> {
    status: &'static str,
    #[serde(flatten)]
    failure: &'a AgentFailure,
    error: String,
}

impl Serialize for AgentEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AgentEnvelope", 2)?;
        match &self.outcome {
            Ok(payload) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("response", payload)?;
            }
            Err(failure) => {
                state.serialize_field("success", &false)?;
                state.serialize_field(
                    "response",
                    &FailureBody {
                        status: "error",
                        failure,
                        error: failure.to_string(),
                    },
                )?;
            }
        }
        state.end()
    }
}

pub mod client;
pub mod envelope;
pub mod interface;
pub mod normalize;
pub mod request;
pub mod sequence;

pub use client::AgentGateway;
pub use envelope::{AgentEnvelope, AgentFailure, AgentPayload, EnvelopeError};
pub use interface::AgentInvoker;
pub use request::AgentRequest;
pub use sequence::{LatestSlot, SlotSequencer, Superseded, Ticket};

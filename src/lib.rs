//! Provider-side contract negotiation engine for a dataspace protocol
//! conformance harness.
//!
//! The [`ProviderNegotiationManager`] receives decoded protocol messages,
//! maps them onto negotiation records, enforces the negotiation state machine
//! and notifies registered listeners of every committed transition.

pub mod cli;
pub mod config;
pub mod connector;
pub mod error;
pub mod message;
pub mod negotiation;
pub mod types;

// Re-export commonly used types
pub use config::TckConfig;
pub use connector::{Connector, LocalNegotiationClient, NegotiationClient};
pub use error::{ListenerError, NegotiationError, Result};
pub use message::Message;
pub use negotiation::{
    ChannelListener, Negotiation, NegotiationEvent, NegotiationListener, NegotiationState,
    ProviderNegotiationManager, RecordedEvent,
};
pub use types::ProcessId;

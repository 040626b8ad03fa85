//! Provider-side contract negotiation state machine

pub mod listener;
pub mod manager;
pub mod record;
pub mod types;

pub use listener::{
    ChannelListener, ListenerRegistry, NegotiationEvent, NegotiationListener, RecordedEvent,
};
pub use manager::ProviderNegotiationManager;
pub use record::Negotiation;
pub use types::NegotiationState;

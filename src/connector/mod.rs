//! In-memory connector and the client used to drive it

pub mod client;

pub use client::{LocalNegotiationClient, NegotiationClient};

use std::sync::Arc;

use crate::negotiation::ProviderNegotiationManager;

/// A simple in-memory connector supporting provider control-plane operations
#[derive(Clone, Default)]
pub struct Connector {
    provider_negotiation_manager: Arc<ProviderNegotiationManager>,
}

impl Connector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider_negotiation_manager(&self) -> Arc<ProviderNegotiationManager> {
        self.provider_negotiation_manager.clone()
    }
}

//! Contract negotiation record

use serde::Serialize;

use super::types::NegotiationState;
use crate::error::{NegotiationError, Result};
use crate::types::ProcessId;

/// A contract negotiation tracked on the provider side
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Negotiation {
    id: ProcessId,
    correlation_id: String,
    offer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_address: Option<String>,
    state: NegotiationState,
}

impl Negotiation {
    /// Create a new negotiation in `REQUESTED` with a freshly generated id
    pub fn new(
        correlation_id: impl Into<String>,
        offer_id: impl Into<String>,
        callback_address: Option<String>,
    ) -> Self {
        Self {
            id: ProcessId::generate(),
            correlation_id: correlation_id.into(),
            offer_id: offer_id.into(),
            callback_address,
            state: NegotiationState::Requested,
        }
    }

    /// Provider-assigned process id
    pub fn id(&self) -> &ProcessId {
        &self.id
    }

    /// Consumer-assigned process id
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Id of the currently active offer
    pub fn offer_id(&self) -> &str {
        &self.offer_id
    }

    pub fn callback_address(&self) -> Option<&str> {
        self.callback_address.as_deref()
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Move to `target` if the protocol allows it, then run `side_effect`.
    ///
    /// The new state is committed before `side_effect` runs. A failing side
    /// effect is reported to the caller but does not undo the commit.
    pub fn transition<F>(&mut self, target: NegotiationState, side_effect: F) -> Result<()>
    where
        F: FnOnce(&Negotiation) -> Result<()>,
    {
        if !self.state.can_transition_to(target) {
            return Err(NegotiationError::IllegalTransition {
                operation: "transition",
                id: self.id.to_string(),
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        tracing::debug!("Negotiation {}: {} -> {}", self.id, self.state, target);
        self.state = target;
        side_effect(self)
    }

    /// Replace the active offer and transition in the same step.
    ///
    /// The offer is only replaced when the transition is legal.
    pub fn store_offer<F>(
        &mut self,
        offer_id: impl Into<String>,
        target: NegotiationState,
        side_effect: F,
    ) -> Result<()>
    where
        F: FnOnce(&Negotiation) -> Result<()>,
    {
        if !self.state.can_transition_to(target) {
            return Err(NegotiationError::IllegalTransition {
                operation: "transition",
                id: self.id.to_string(),
                from: self.state.to_string(),
                to: target.to_string(),
            });
        }

        self.offer_id = offer_id.into();
        self.transition(target, side_effect)
    }
}

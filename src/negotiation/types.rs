//! Negotiation states and the provider-side transition table

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::NegotiationError;
use crate::message::constants::{DSPACE_NAMESPACE, DSPACE_NAMESPACE_PREFIX};

/// Negotiation state machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationState {
    /// Consumer has sent a contract request or counter-offer
    Requested,
    /// Provider has sent an offer
    Offered,
    /// Consumer has accepted the most recent offer
    Accepted,
    /// Provider has sent an agreement
    Agreed,
    /// Consumer has verified the agreement
    Verified,
    /// Provider has finalized the agreement
    Finalized,
    /// Either party terminated the negotiation
    Terminated,
}

impl NegotiationState {
    pub const ALL: [NegotiationState; 7] = [
        NegotiationState::Requested,
        NegotiationState::Offered,
        NegotiationState::Accepted,
        NegotiationState::Agreed,
        NegotiationState::Verified,
        NegotiationState::Finalized,
        NegotiationState::Terminated,
    ];

    /// Check if the negotiation can no longer change state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiationState::Finalized | NegotiationState::Terminated
        )
    }

    /// Check if moving to `target` is a legal protocol step
    pub fn can_transition_to(&self, target: NegotiationState) -> bool {
        use NegotiationState::*;

        match self {
            Requested => matches!(target, Offered | Requested | Terminated),
            Offered => matches!(target, Accepted | Requested | Terminated),
            Accepted => matches!(target, Agreed | Terminated),
            Agreed => matches!(target, Verified | Terminated),
            Verified => matches!(target, Finalized | Terminated),
            Finalized | Terminated => false,
        }
    }

    /// States reachable from this one
    pub fn successors(&self) -> Vec<NegotiationState> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    /// Protocol name in compact form, e.g. `dspace:REQUESTED`
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationState::Requested => "dspace:REQUESTED",
            NegotiationState::Offered => "dspace:OFFERED",
            NegotiationState::Accepted => "dspace:ACCEPTED",
            NegotiationState::Agreed => "dspace:AGREED",
            NegotiationState::Verified => "dspace:VERIFIED",
            NegotiationState::Finalized => "dspace:FINALIZED",
            NegotiationState::Terminated => "dspace:TERMINATED",
        }
    }

    pub fn name(&self) -> &'static str {
        &self.as_str()[DSPACE_NAMESPACE_PREFIX.len()..]
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for NegotiationState {
    type Err = NegotiationError;

    /// Accepts `REQUESTED`, `dspace:REQUESTED` and the expanded IRI form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let local = s
            .strip_prefix(DSPACE_NAMESPACE)
            .or_else(|| s.strip_prefix(DSPACE_NAMESPACE_PREFIX))
            .unwrap_or(s);

        Self::ALL
            .into_iter()
            .find(|state| state.name().eq_ignore_ascii_case(local))
            .ok_or_else(|| NegotiationError::UnknownState(s.to_string()))
    }
}

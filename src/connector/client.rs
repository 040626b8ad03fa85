//! Negotiation client contract
//!
//! Verification scenarios call the connector under test through a
//! [`NegotiationClient`]. [`LocalNegotiationClient`] delivers messages to an
//! in-process [`Connector`] instead of a remote endpoint.

use crate::error::Result;
use crate::message::{negotiation_message, Message};

use super::Connector;

/// Proxy to the connector being verified for contract negotiation
pub trait NegotiationClient: Send + Sync {
    /// Send an initial contract request or a counter-offer; returns the negotiation
    fn contract_request(&self, message: &Message) -> Result<Message>;

    /// Accept the most recent offer
    fn consumer_accept(&self, offer: &Message) -> Result<()>;

    /// Verify the contract agreement with the provider
    fn consumer_verify(&self, verification: &Message) -> Result<()>;

    fn terminate(&self, termination: &Message) -> Result<()>;

    fn get_negotiation(&self, process_id: &str) -> Result<Message>;
}

/// Client bound to the provider manager of a local connector
#[derive(Clone)]
pub struct LocalNegotiationClient {
    connector: Connector,
}

impl LocalNegotiationClient {
    pub fn new(connector: Connector) -> Self {
        Self { connector }
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }
}

impl NegotiationClient for LocalNegotiationClient {
    fn contract_request(&self, message: &Message) -> Result<Message> {
        let negotiation = self
            .connector
            .provider_negotiation_manager()
            .handle_contract_request(message)?;
        Ok(negotiation_message(&negotiation))
    }

    fn consumer_accept(&self, offer: &Message) -> Result<()> {
        self.connector
            .provider_negotiation_manager()
            .handle_agreed(offer)?;
        Ok(())
    }

    fn consumer_verify(&self, verification: &Message) -> Result<()> {
        self.connector
            .provider_negotiation_manager()
            .handle_verified(verification)?;
        Ok(())
    }

    fn terminate(&self, termination: &Message) -> Result<()> {
        self.connector
            .provider_negotiation_manager()
            .terminated(termination)?;
        Ok(())
    }

    fn get_negotiation(&self, process_id: &str) -> Result<Message> {
        let negotiation = self
            .connector
            .provider_negotiation_manager()
            .find_by_id(process_id)?;
        Ok(negotiation_message(&negotiation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NegotiationError;
    use crate::message::constants::{DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, DSPACE_PROPERTY_STATE_EXPANDED};
    use crate::message::{
        contract_request_message, string_id_property, string_property, termination_message,
    };
    use crate::negotiation::NegotiationState;

    #[test]
    fn test_contract_request_returns_negotiation() {
        let client = LocalNegotiationClient::new(Connector::new());

        let response = client
            .contract_request(&contract_request_message("c1", "offer-1", None))
            .unwrap();

        let provider_pid =
            string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response).unwrap();
        let state: NegotiationState = string_property(DSPACE_PROPERTY_STATE_EXPANDED, &response)
            .unwrap()
            .parse()
            .unwrap();
        assert_eq!(state, NegotiationState::Requested);

        let fetched = client.get_negotiation(&provider_pid).unwrap();
        assert_eq!(fetched, response);
    }

    #[test]
    fn test_terminate_through_client() {
        let connector = Connector::new();
        let client = LocalNegotiationClient::new(connector.clone());
        let response = client
            .contract_request(&contract_request_message("c1", "offer-1", None))
            .unwrap();
        let provider_pid =
            string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response).unwrap();

        client
            .terminate(&termination_message(&provider_pid, "c1", "1", "done"))
            .unwrap();

        let negotiation = connector
            .provider_negotiation_manager()
            .find_by_id(&provider_pid)
            .unwrap();
        assert_eq!(negotiation.state(), NegotiationState::Terminated);
    }

    #[test]
    fn test_get_unknown_negotiation() {
        let client = LocalNegotiationClient::new(Connector::new());
        assert!(matches!(
            client.get_negotiation("missing"),
            Err(NegotiationError::NotFound { .. })
        ));
    }
}

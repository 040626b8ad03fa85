//! Dataspace protocol namespace and property keys

pub const DSPACE_NAMESPACE: &str = "https://w3id.org/dspace/v0.8/";
pub const DSPACE_NAMESPACE_KEY: &str = "dspace";
pub const DSPACE_NAMESPACE_PREFIX: &str = "dspace:";

pub const CONTEXT: &str = "@context";
pub const ID: &str = "@id";
pub const VALUE: &str = "@value";
pub const TYPE: &str = "@type";

pub const DSPACE_PROPERTY_CONSUMER_PID: &str = "dspace:consumerPid";
pub const DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: &str = "https://w3id.org/dspace/v0.8/consumerPid";

pub const DSPACE_PROPERTY_PROVIDER_PID: &str = "dspace:providerPid";
pub const DSPACE_PROPERTY_PROVIDER_PID_EXPANDED: &str = "https://w3id.org/dspace/v0.8/providerPid";

pub const DSPACE_PROPERTY_CODE: &str = "dspace:code";
pub const DSPACE_PROPERTY_CODE_EXPANDED: &str = "https://w3id.org/dspace/v0.8/code";

pub const DSPACE_PROPERTY_REASON: &str = "dspace:reason";
pub const DSPACE_PROPERTY_REASON_EXPANDED: &str = "https://w3id.org/dspace/v0.8/reason";

pub const DSPACE_PROPERTY_STATE: &str = "dspace:state";
pub const DSPACE_PROPERTY_STATE_EXPANDED: &str = "https://w3id.org/dspace/v0.8/state";

pub const DSPACE_PROPERTY_EVENT_TYPE: &str = "dspace:eventType";
pub const DSPACE_PROPERTY_EVENT_TYPE_EXPANDED: &str = "https://w3id.org/dspace/v0.8/eventType";

pub const DSPACE_PROPERTY_CALLBACK_ADDRESS: &str = "dspace:callbackAddress";
pub const DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED: &str =
    "https://w3id.org/dspace/v0.8/callbackAddress";

pub const DSPACE_PROPERTY_OFFER: &str = "dspace:offer";
pub const DSPACE_PROPERTY_OFFER_EXPANDED: &str = "https://w3id.org/dspace/v0.8/offer";

// Message types
pub const DSPACE_TYPE_CONTRACT_REQUEST_MESSAGE: &str =
    "https://w3id.org/dspace/v0.8/ContractRequestMessage";
pub const DSPACE_TYPE_CONTRACT_NEGOTIATION_EVENT_MESSAGE: &str =
    "https://w3id.org/dspace/v0.8/ContractNegotiationEventMessage";
pub const DSPACE_TYPE_CONTRACT_AGREEMENT_VERIFICATION_MESSAGE: &str =
    "https://w3id.org/dspace/v0.8/ContractAgreementVerificationMessage";
pub const DSPACE_TYPE_CONTRACT_NEGOTIATION_TERMINATION_MESSAGE: &str =
    "https://w3id.org/dspace/v0.8/ContractNegotiationTerminationMessage";
pub const DSPACE_TYPE_CONTRACT_NEGOTIATION: &str = "dspace:ContractNegotiation";
pub const ODRL_TYPE_OFFER: &str = "http://www.w3.org/ns/odrl/2/Offer";

pub const DSPACE_EVENT_ACCEPTED: &str = "https://w3id.org/dspace/v0.8/ACCEPTED";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expanded_keys_share_namespace() {
        for (compact, expanded) in [
            (DSPACE_PROPERTY_CONSUMER_PID, DSPACE_PROPERTY_CONSUMER_PID_EXPANDED),
            (DSPACE_PROPERTY_PROVIDER_PID, DSPACE_PROPERTY_PROVIDER_PID_EXPANDED),
            (DSPACE_PROPERTY_OFFER, DSPACE_PROPERTY_OFFER_EXPANDED),
            (DSPACE_PROPERTY_CALLBACK_ADDRESS, DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED),
            (DSPACE_PROPERTY_EVENT_TYPE, DSPACE_PROPERTY_EVENT_TYPE_EXPANDED),
            (DSPACE_PROPERTY_STATE, DSPACE_PROPERTY_STATE_EXPANDED),
        ] {
            let local = compact.strip_prefix(DSPACE_NAMESPACE_PREFIX).unwrap();
            assert_eq!(expanded, format!("{}{}", DSPACE_NAMESPACE, local));
        }
    }
}

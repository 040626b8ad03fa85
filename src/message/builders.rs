//! Builders for the protocol messages exchanged during a negotiation

use serde_json::{json, Value};

use super::constants::*;
use super::Message;
use crate::negotiation::Negotiation;

fn into_message(value: Value) -> Message {
    match value {
        Value::Object(object) => object,
        _ => Message::new(),
    }
}

fn id_ref(id: &str) -> Value {
    json!([{ ID: id }])
}

fn literal(value: &str) -> Value {
    json!([{ VALUE: value }])
}

/// Initial contract request keyed by the consumer process id
pub fn contract_request_message(
    consumer_pid: &str,
    offer_id: &str,
    callback_address: Option<&str>,
) -> Message {
    let mut message = into_message(json!({
        TYPE: [DSPACE_TYPE_CONTRACT_REQUEST_MESSAGE],
        DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: id_ref(consumer_pid),
        DSPACE_PROPERTY_OFFER_EXPANDED: [{ ID: offer_id, TYPE: [ODRL_TYPE_OFFER] }],
    }));
    if let Some(address) = callback_address {
        message.insert(
            DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED.to_string(),
            literal(address),
        );
    }
    message
}

/// Counter-offer targeting an existing negotiation
pub fn counter_offer_message(provider_pid: &str, consumer_pid: &str, offer_id: &str) -> Message {
    let mut message = contract_request_message(consumer_pid, offer_id, None);
    message.insert(
        DSPACE_PROPERTY_PROVIDER_PID_EXPANDED.to_string(),
        id_ref(provider_pid),
    );
    message
}

/// Consumer acknowledgement that the most recent offer is accepted
pub fn agreement_event_message(provider_pid: &str, consumer_pid: &str) -> Message {
    into_message(json!({
        TYPE: [DSPACE_TYPE_CONTRACT_NEGOTIATION_EVENT_MESSAGE],
        DSPACE_PROPERTY_PROVIDER_PID_EXPANDED: id_ref(provider_pid),
        DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: id_ref(consumer_pid),
        DSPACE_PROPERTY_EVENT_TYPE_EXPANDED: literal(DSPACE_EVENT_ACCEPTED),
    }))
}

pub fn verification_message(provider_pid: &str, consumer_pid: &str) -> Message {
    into_message(json!({
        TYPE: [DSPACE_TYPE_CONTRACT_AGREEMENT_VERIFICATION_MESSAGE],
        DSPACE_PROPERTY_PROVIDER_PID_EXPANDED: id_ref(provider_pid),
        DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: id_ref(consumer_pid),
    }))
}

pub fn termination_message(provider_pid: &str, consumer_pid: &str, code: &str, reason: &str) -> Message {
    into_message(json!({
        TYPE: [DSPACE_TYPE_CONTRACT_NEGOTIATION_TERMINATION_MESSAGE],
        DSPACE_PROPERTY_PROVIDER_PID_EXPANDED: id_ref(provider_pid),
        DSPACE_PROPERTY_CONSUMER_PID_EXPANDED: id_ref(consumer_pid),
        DSPACE_PROPERTY_CODE_EXPANDED: literal(code),
        DSPACE_PROPERTY_REASON_EXPANDED: [{ VALUE: reason }],
    }))
}

/// Renders a negotiation record as a compacted `dspace:ContractNegotiation`
pub fn negotiation_message(negotiation: &Negotiation) -> Message {
    into_message(json!({
        CONTEXT: { DSPACE_NAMESPACE_KEY: DSPACE_NAMESPACE },
        TYPE: DSPACE_TYPE_CONTRACT_NEGOTIATION,
        DSPACE_PROPERTY_PROVIDER_PID: negotiation.id().as_str(),
        DSPACE_PROPERTY_CONSUMER_PID: negotiation.correlation_id(),
        DSPACE_PROPERTY_STATE: negotiation.state().as_str(),
    }))
}

//! Protocol message access for the negotiation manager

pub mod builders;
pub mod constants;
pub mod functions;

/// A decoded protocol message: namespaced property keys mapped to values
pub type Message = serde_json::Map<String, serde_json::Value>;

pub use builders::{
    agreement_event_message, contract_request_message, counter_offer_message,
    negotiation_message, termination_message, verification_message,
};
pub use functions::{
    compact_string_property, has_property, map_property, optional_string_property,
    string_id_property, string_property,
};

//! Property extraction over decoded protocol messages
//!
//! Messages arrive either compacted (`dspace:providerPid: "..."`) or in
//! JSON-LD expanded form (`https://w3id.org/dspace/v0.8/providerPid:
//! [{"@value": "..."}]`). Lookups by an expanded key fall back to the
//! compact alias so both shapes resolve to the same value.

use serde_json::Value;

use super::constants::{DSPACE_NAMESPACE, DSPACE_NAMESPACE_PREFIX, ID, VALUE};
use super::Message;
use crate::error::{NegotiationError, Result};

const OPERATION: &str = "message";

fn compact_alias(key: &str) -> Option<String> {
    key.strip_prefix(DSPACE_NAMESPACE)
        .map(|local| format!("{}{}", DSPACE_NAMESPACE_PREFIX, local))
}

fn lookup<'a>(key: &str, message: &'a Message) -> Option<&'a Value> {
    message.get(key).or_else(|| {
        compact_alias(key)
            .as_deref()
            .and_then(|alias| message.get(alias))
    })
}

fn missing(key: &str) -> NegotiationError {
    NegotiationError::RequiredFieldMissing {
        operation: OPERATION,
        field: key.to_string(),
    }
}

fn invalid(key: &str, reason: &str) -> NegotiationError {
    NegotiationError::InvalidProperty {
        operation: OPERATION,
        field: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Unwraps the single-element arrays produced by JSON-LD expansion
fn single<'a>(key: &str, value: &'a Value) -> Result<&'a Value> {
    match value {
        Value::Array(values) if values.len() == 1 => Ok(&values[0]),
        Value::Array(values) => Err(invalid(
            key,
            &format!("expected a single value, found {}", values.len()),
        )),
        other => Ok(other),
    }
}

fn string_value(key: &str, value: &Value, allow_id: bool) -> Result<String> {
    match single(key, value)? {
        Value::String(s) => Ok(s.clone()),
        Value::Object(object) => {
            let inner = object
                .get(VALUE)
                .or_else(|| if allow_id { object.get(ID) } else { None });
            match inner {
                Some(Value::String(s)) => Ok(s.clone()),
                _ => Err(invalid(key, "expected a string value")),
            }
        }
        _ => Err(invalid(key, "expected a string value")),
    }
}

/// Returns true if the message carries the property under its expanded or compact key
pub fn has_property(key: &str, message: &Message) -> bool {
    lookup(key, message).is_some()
}

/// Reads a required string property
pub fn string_property(key: &str, message: &Message) -> Result<String> {
    let value = lookup(key, message).ok_or_else(|| missing(key))?;
    string_value(key, value, false)
}

/// Reads a required identifier property, accepting `@id` node references
pub fn string_id_property(key: &str, message: &Message) -> Result<String> {
    let value = lookup(key, message).ok_or_else(|| missing(key))?;
    string_value(key, value, true)
}

/// Reads an optional string property; absence is not an error
pub fn optional_string_property(key: &str, message: &Message) -> Result<Option<String>> {
    match lookup(key, message) {
        Some(value) => string_value(key, value, false).map(Some),
        None => Ok(None),
    }
}

/// Reads a required nested object property
pub fn map_property(key: &str, message: &Message) -> Result<Message> {
    let value = lookup(key, message).ok_or_else(|| missing(key))?;
    match single(key, value)? {
        Value::Object(object) => Ok(object.clone()),
        _ => Err(invalid(key, "expected an object")),
    }
}

/// Reads a compact (non-namespaced) string property such as `@id`
pub fn compact_string_property(key: &str, message: &Message) -> Result<String> {
    match message.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(invalid(key, "expected a string value")),
        None => Err(missing(key)),
    }
}

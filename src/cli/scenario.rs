//! Scenario files replayed by the harness

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::error::{NegotiationError, Result};
use crate::message::Message;
use crate::negotiation::{NegotiationState, RecordedEvent};

/// Replaced in step messages with the provider process id of the current negotiation
pub const PROVIDER_PID_PLACEHOLDER: &str = "${providerPid}";

/// A named sequence of protocol steps
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let scenario: Scenario = serde_json::from_str(&contents)?;
        if scenario.steps.is_empty() {
            return Err(NegotiationError::Scenario(format!(
                "scenario {} has no steps",
                scenario.name
            )));
        }
        Ok(scenario)
    }
}

/// One protocol step. Steps without an `id` act on the negotiation returned
/// by the latest `contractRequest`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Step {
    ContractRequest {
        message: Message,
    },
    Offered {
        #[serde(default)]
        id: Option<String>,
    },
    Agreed {
        #[serde(default)]
        id: Option<String>,
    },
    Finalized {
        #[serde(default)]
        id: Option<String>,
    },
    Accept {
        message: Message,
    },
    Verify {
        message: Message,
    },
    Terminate {
        message: Message,
    },
    ExpectState {
        state: NegotiationState,
        #[serde(default)]
        id: Option<String>,
    },
    /// Runs the nested step and requires it to fail
    ExpectFailure {
        step: Box<Step>,
    },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::ContractRequest { .. } => "contractRequest",
            Step::Offered { .. } => "offered",
            Step::Agreed { .. } => "agreed",
            Step::Finalized { .. } => "finalized",
            Step::Accept { .. } => "accept",
            Step::Verify { .. } => "verify",
            Step::Terminate { .. } => "terminate",
            Step::ExpectState { .. } => "expectState",
            Step::ExpectFailure { .. } => "expectFailure",
        }
    }
}

/// Outcome of a completed scenario run
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioReport {
    pub name: String,
    pub steps: Vec<String>,
    pub events: Vec<RecordedEvent>,
    pub final_state: Option<NegotiationState>,
}

fn substitute_value(value: &mut Value, provider_pid: Option<&str>) -> Result<()> {
    match value {
        Value::String(s) if s.contains(PROVIDER_PID_PLACEHOLDER) => {
            let pid = provider_pid.ok_or_else(|| {
                NegotiationError::Scenario(format!(
                    "{} used before any contractRequest",
                    PROVIDER_PID_PLACEHOLDER
                ))
            })?;
            *s = s.replace(PROVIDER_PID_PLACEHOLDER, pid);
        }
        Value::Array(values) => {
            for v in values {
                substitute_value(v, provider_pid)?;
            }
        }
        Value::Object(object) => {
            for v in object.values_mut() {
                substitute_value(v, provider_pid)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Copy of `message` with the provider pid placeholder filled in
pub fn substitute(message: &Message, provider_pid: Option<&str>) -> Result<Message> {
    let mut message = message.clone();
    for value in message.values_mut() {
        substitute_value(value, provider_pid)?;
    }
    Ok(message)
}

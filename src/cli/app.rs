//! Harness application replaying scenarios against the local connector

use std::sync::Arc;

use super::scenario::{substitute, Scenario, ScenarioReport, Step};
use crate::config::TckConfig;
use crate::connector::{Connector, LocalNegotiationClient, NegotiationClient};
use crate::error::{NegotiationError, Result};
use crate::message::constants::{
    DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, VALUE,
};
use crate::message::{has_property, string_id_property, Message};
use crate::negotiation::{ChannelListener, NegotiationListener, NegotiationState};

/// Main harness application
#[derive(Clone)]
pub struct TckApp {
    config: TckConfig,
    connector: Connector,
    client: LocalNegotiationClient,
}

/// Negotiation the current scenario is acting on
#[derive(Default)]
struct StepContext {
    provider_pid: Option<String>,
}

impl StepContext {
    fn target(&self, id: &Option<String>, operation: &str) -> Result<String> {
        id.clone()
            .or_else(|| self.provider_pid.clone())
            .ok_or_else(|| {
                NegotiationError::Scenario(format!("{} has no negotiation to act on", operation))
            })
    }
}

impl TckApp {
    pub fn new(config: TckConfig) -> Result<Self> {
        config.validate()?;

        let connector = Connector::new();
        let client = LocalNegotiationClient::new(connector.clone());

        Ok(Self {
            config,
            connector,
            client,
        })
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }

    /// Run every step in order, collecting listener events on a background task
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioReport> {
        tracing::info!("Running scenario: {}", scenario.name);

        let manager = self.connector.provider_negotiation_manager();
        let (listener, mut rx) = ChannelListener::new();
        let listener: Arc<dyn NegotiationListener> = Arc::new(listener);
        manager.register_listener(listener.clone());

        let collector = tokio::spawn(async move {
            let mut events = Vec::new();
            while let Some(event) = rx.recv().await {
                tracing::debug!(
                    "Event {} for negotiation {}",
                    event.event,
                    event.negotiation.id()
                );
                events.push(event);
            }
            events
        });

        let mut context = StepContext::default();
        let mut executed = Vec::with_capacity(scenario.steps.len());
        let outcome = scenario
            .steps
            .iter()
            .enumerate()
            .try_for_each(|(index, step)| {
                self.execute(step, &mut context).map_err(|e| {
                    NegotiationError::Scenario(format!(
                        "step {} ({}) failed: {}",
                        index + 1,
                        step.name(),
                        e
                    ))
                })?;
                executed.push(step.name().to_string());
                Ok(())
            });

        // Dropping the last sender ends the collector
        manager.deregister_listener(&listener);
        drop(listener);
        let events = collector
            .await
            .map_err(|e| NegotiationError::Scenario(format!("event collector failed: {}", e)))?;

        if let Err(e) = outcome {
            tracing::error!("Scenario {} failed: {}", scenario.name, e);
            return Err(e);
        }

        let final_state = match &context.provider_pid {
            Some(pid) => Some(manager.find_by_id(pid)?.state()),
            None => None,
        };

        tracing::info!(
            "Scenario {} passed: {} steps, {} events",
            scenario.name,
            executed.len(),
            events.len()
        );

        Ok(ScenarioReport {
            name: scenario.name.clone(),
            steps: executed,
            events,
            final_state,
        })
    }

    fn execute(&self, step: &Step, context: &mut StepContext) -> Result<()> {
        let manager = self.connector.provider_negotiation_manager();
        let pid = context.provider_pid.as_deref();

        match step {
            Step::ContractRequest { message } => {
                let message = self.with_default_callback(substitute(message, pid)?);
                let response = self.client.contract_request(&message)?;
                let provider_pid =
                    string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, &response)?;
                tracing::info!("Contract request answered by negotiation {}", provider_pid);
                context.provider_pid = Some(provider_pid);
            }
            Step::Offered { id } => {
                manager.offered(&context.target(id, "offered")?)?;
            }
            Step::Agreed { id } => {
                manager.agreed(&context.target(id, "agreed")?)?;
            }
            Step::Finalized { id } => {
                manager.finalized(&context.target(id, "finalized")?)?;
            }
            Step::Accept { message } => {
                self.client.consumer_accept(&substitute(message, pid)?)?;
            }
            Step::Verify { message } => {
                self.client.consumer_verify(&substitute(message, pid)?)?;
            }
            Step::Terminate { message } => {
                self.client.terminate(&substitute(message, pid)?)?;
            }
            Step::ExpectState { state, id } => {
                let id = context.target(id, "expectState")?;
                let actual: NegotiationState = manager.find_by_id(&id)?.state();
                if actual != *state {
                    return Err(NegotiationError::Scenario(format!(
                        "negotiation {} is {}, expected {}",
                        id, actual, state
                    )));
                }
            }
            Step::ExpectFailure { step } => match self.execute(step, context) {
                Ok(()) => {
                    return Err(NegotiationError::Scenario(format!(
                        "{} succeeded but was expected to fail",
                        step.name()
                    )));
                }
                Err(e) => tracing::info!("{} failed as expected: {}", step.name(), e),
            },
        }

        Ok(())
    }

    fn with_default_callback(&self, mut message: Message) -> Message {
        if let Some(address) = &self.config.default_callback_address {
            if !has_property(DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, &message) {
                message.insert(
                    DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED.to_string(),
                    serde_json::json!([{ VALUE: address }]),
                );
            }
        }
        message
    }
}

//! Provider-side negotiation manager
//!
//! Resolves inbound protocol messages to negotiation records, drives the
//! state machine and fans out committed transitions to listeners.
//!
//! Each record carries a flow lock and a committed view. A whole
//! read-validate-commit-notify flow runs under the flow lock, so concurrent
//! messages for one negotiation are serialized and listeners observe its
//! events in commit order. The committed view is only write-locked for the
//! instant of the commit, so lookups never wait on a flow and a listener may
//! read the manager back while it is being notified. The store lock is only
//! held for map access.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

use super::listener::{ListenerRegistry, NegotiationEvent, NegotiationListener};
use super::record::Negotiation;
use super::types::NegotiationState;
use crate::error::{NegotiationError, Result};
use crate::message::constants::{
    DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, DSPACE_PROPERTY_CONSUMER_PID_EXPANDED,
    DSPACE_PROPERTY_EVENT_TYPE_EXPANDED, DSPACE_PROPERTY_OFFER_EXPANDED,
    DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, ID,
};
use crate::message::{
    compact_string_property, has_property, map_property, optional_string_property,
    string_id_property, string_property, Message,
};
use crate::types::ProcessId;

/// A stored record; the correlation id is immutable and readable without any record lock
struct StoredNegotiation {
    correlation_id: String,
    flow: Mutex<()>,
    committed: RwLock<Negotiation>,
}

impl StoredNegotiation {
    fn new(negotiation: Negotiation) -> Self {
        Self {
            correlation_id: negotiation.correlation_id().to_string(),
            flow: Mutex::new(()),
            committed: RwLock::new(negotiation),
        }
    }

    fn snapshot(&self) -> Negotiation {
        self.committed.read().clone()
    }

    fn commit(&self, negotiation: &Negotiation) {
        *self.committed.write() = negotiation.clone();
    }
}

/// Manages contract negotiations on a provider
#[derive(Default)]
pub struct ProviderNegotiationManager {
    negotiations: RwLock<HashMap<ProcessId, Arc<StoredNegotiation>>>,
    listeners: ListenerRegistry,
}

impl ProviderNegotiationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an initial contract request or a counter-offer.
    ///
    /// A message carrying a provider process id is a counter-offer for that
    /// negotiation. Otherwise it is an initial request keyed by the consumer
    /// process id; a repeated initial request returns the existing record
    /// without creating, transitioning or notifying anything.
    pub fn handle_contract_request(&self, message: &Message) -> Result<Negotiation> {
        const OPERATION: &str = "handleContractRequest";

        if has_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message) {
            let process_id = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, message)
                .map_err(|e| e.in_operation(OPERATION))?;
            self.handle_counter_offer(message, &process_id)
        } else {
            self.handle_initial_request(message)
        }
    }

    /// Provider sends an offer
    pub fn offered(&self, provider_id: &str) -> Result<Negotiation> {
        self.transition(
            "offered",
            provider_id,
            NegotiationState::Offered,
            NegotiationEvent::Offered,
        )
    }

    /// Provider sends an agreement
    pub fn agreed(&self, provider_id: &str) -> Result<Negotiation> {
        self.transition(
            "agreed",
            provider_id,
            NegotiationState::Agreed,
            NegotiationEvent::Agreed,
        )
    }

    /// Provider finalizes the agreement
    pub fn finalized(&self, provider_id: &str) -> Result<Negotiation> {
        self.transition(
            "finalized",
            provider_id,
            NegotiationState::Finalized,
            NegotiationEvent::Finalized,
        )
    }

    /// Consumer acknowledges acceptance of the most recent offer.
    ///
    /// Moves the negotiation to `ACCEPTED`, distinct from the provider-driven
    /// [`agreed`](Self::agreed) step, and notifies listeners with the agreed event.
    pub fn handle_agreed(&self, event: &Message) -> Result<Negotiation> {
        const OPERATION: &str = "handleAgreed";

        let provider_id = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, event)
            .map_err(|e| e.in_operation(OPERATION))?;
        string_property(DSPACE_PROPERTY_EVENT_TYPE_EXPANDED, event)
            .map_err(|e| e.in_operation(OPERATION))?;

        self.transition(
            OPERATION,
            &provider_id,
            NegotiationState::Accepted,
            NegotiationEvent::Agreed,
        )
    }

    /// Consumer verifies the agreement
    pub fn handle_verified(&self, verification: &Message) -> Result<Negotiation> {
        const OPERATION: &str = "handleVerified";

        let provider_id = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, verification)
            .map_err(|e| e.in_operation(OPERATION))?;

        // TODO: check the verification content against the stored agreement once agreements are tracked
        self.transition(
            OPERATION,
            &provider_id,
            NegotiationState::Verified,
            NegotiationEvent::Verified,
        )
    }

    /// Consumer terminates the negotiation; the provider process id is mandatory
    pub fn terminated(&self, termination: &Message) -> Result<Negotiation> {
        const OPERATION: &str = "terminated";

        let provider_id = string_id_property(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED, termination)
            .map_err(|e| e.in_operation(OPERATION))?;

        self.transition(
            OPERATION,
            &provider_id,
            NegotiationState::Terminated,
            NegotiationEvent::Terminated,
        )
    }

    /// Exact lookup by provider process id
    pub fn find_by_id(&self, id: &str) -> Result<Negotiation> {
        Ok(self.stored("findById", id)?.snapshot())
    }

    /// Lookup by consumer process id; absence is a normal outcome
    pub fn find_by_correlation_id(&self, correlation_id: &str) -> Option<Negotiation> {
        let stored = self
            .negotiations
            .read()
            .values()
            .find(|s| s.correlation_id == correlation_id)
            .cloned()?;
        Some(stored.snapshot())
    }

    /// Snapshot of every negotiation in the store
    pub fn negotiations(&self) -> Vec<Negotiation> {
        let stored: Vec<Arc<StoredNegotiation>> =
            self.negotiations.read().values().cloned().collect();
        stored.iter().map(|s| s.snapshot()).collect()
    }

    pub fn len(&self) -> usize {
        self.negotiations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.negotiations.read().is_empty()
    }

    pub fn register_listener(&self, listener: Arc<dyn NegotiationListener>) {
        self.listeners.register(listener);
    }

    pub fn deregister_listener(&self, listener: &Arc<dyn NegotiationListener>) -> bool {
        self.listeners.deregister(listener)
    }

    fn stored(&self, operation: &'static str, id: &str) -> Result<Arc<StoredNegotiation>> {
        self.negotiations
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| NegotiationError::NotFound {
                operation,
                id: id.to_string(),
            })
    }

    fn transition(
        &self,
        operation: &'static str,
        provider_id: &str,
        target: NegotiationState,
        event: NegotiationEvent,
    ) -> Result<Negotiation> {
        let stored = self.stored(operation, provider_id)?;
        let _flow = stored.flow.lock();
        let mut negotiation = stored.snapshot();

        negotiation
            .transition(target, |n| {
                stored.commit(n);
                self.listeners.notify(event, n)
            })
            .map_err(|e| e.in_operation(operation))
            .inspect_err(|e| tracing::warn!("{} failed: {}", operation, e))?;

        Ok(negotiation)
    }

    fn handle_counter_offer(&self, message: &Message, process_id: &str) -> Result<Negotiation> {
        const OPERATION: &str = "handleContractRequest";

        let stored = self.stored(OPERATION, process_id)?;
        let offer = map_property(DSPACE_PROPERTY_OFFER_EXPANDED, message)
            .map_err(|e| e.in_operation(OPERATION))?;
        let offer_id = compact_string_property(ID, &offer).map_err(|e| e.in_operation(OPERATION))?;

        let _flow = stored.flow.lock();
        let mut negotiation = stored.snapshot();
        tracing::debug!(
            "Counter-offer {} for negotiation {}",
            offer_id,
            negotiation.id()
        );
        negotiation
            .store_offer(offer_id, NegotiationState::Requested, |n| {
                stored.commit(n);
                self.listeners.notify(NegotiationEvent::ContractRequested, n)
            })
            .map_err(|e| e.in_operation(OPERATION))
            .inspect_err(|e| tracing::warn!("{} failed: {}", OPERATION, e))?;

        Ok(negotiation)
    }

    fn handle_initial_request(&self, message: &Message) -> Result<Negotiation> {
        const OPERATION: &str = "handleContractRequest";

        let consumer_id = string_id_property(DSPACE_PROPERTY_CONSUMER_PID_EXPANDED, message)
            .map_err(|e| e.in_operation(OPERATION))?;

        if let Some(previous) = self.find_by_correlation_id(&consumer_id) {
            tracing::debug!(
                "Duplicate contract request for {}, returning negotiation {}",
                consumer_id,
                previous.id()
            );
            return Ok(previous);
        }

        let offer = map_property(DSPACE_PROPERTY_OFFER_EXPANDED, message)
            .map_err(|e| e.in_operation(OPERATION))?;
        let offer_id = compact_string_property(ID, &offer).map_err(|e| e.in_operation(OPERATION))?;
        let callback_address =
            optional_string_property(DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED, message)
                .map_err(|e| e.in_operation(OPERATION))?;

        let negotiation = Negotiation::new(consumer_id.clone(), offer_id, callback_address);
        let stored = Arc::new(StoredNegotiation::new(negotiation.clone()));

        // Held until contractRequested is delivered so no transition can overtake it
        let _flow = stored.flow.lock();

        // Check and insert under one write lock so racing duplicates create a single record
        {
            let mut negotiations = self.negotiations.write();
            let existing = negotiations
                .values()
                .find(|s| s.correlation_id == consumer_id)
                .cloned();
            if let Some(existing) = existing {
                drop(negotiations);
                let previous = existing.snapshot();
                return Ok(previous);
            }
            negotiations.insert(negotiation.id().clone(), stored.clone());
        }

        tracing::info!(
            "New contract negotiation {} for consumer {}",
            negotiation.id(),
            consumer_id
        );
        self.listeners
            .notify(NegotiationEvent::ContractRequested, &negotiation)
            .map_err(|e| e.in_operation(OPERATION))?;

        Ok(negotiation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ListenerError;
    use crate::message::{
        agreement_event_message, contract_request_message, counter_offer_message,
        termination_message, verification_message,
    };

    fn request(manager: &ProviderNegotiationManager, consumer: &str) -> Negotiation {
        manager
            .handle_contract_request(&contract_request_message(
                consumer,
                "offer-1",
                Some("https://consumer/callback"),
            ))
            .unwrap()
    }

    #[test]
    fn test_manager_creation() {
        let manager = ProviderNegotiationManager::new();
        assert!(manager.is_empty());
        assert!(manager.negotiations().is_empty());
    }

    #[test]
    fn test_initial_request_creates_negotiation() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");

        assert_eq!(n.state(), NegotiationState::Requested);
        assert_eq!(n.correlation_id(), "c1");
        assert_eq!(n.offer_id(), "offer-1");
        assert_eq!(n.callback_address(), Some("https://consumer/callback"));
        assert_eq!(manager.find_by_id(n.id().as_str()).unwrap(), n);
    }

    #[test]
    fn test_duplicate_initial_request_is_idempotent() {
        let manager = ProviderNegotiationManager::new();
        let first = request(&manager, "c1");
        let second = request(&manager, "c1");

        assert_eq!(first.id(), second.id());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_counter_offer_updates_in_place() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        manager.offered(n.id().as_str()).unwrap();

        let updated = manager
            .handle_contract_request(&counter_offer_message(n.id().as_str(), "c1", "offer-2"))
            .unwrap();

        assert_eq!(updated.id(), n.id());
        assert_eq!(updated.correlation_id(), "c1");
        assert_eq!(updated.offer_id(), "offer-2");
        assert_eq!(updated.state(), NegotiationState::Requested);
    }

    #[test]
    fn test_counter_offer_for_unknown_negotiation() {
        let manager = ProviderNegotiationManager::new();
        let err = manager
            .handle_contract_request(&counter_offer_message("missing", "c1", "offer-2"))
            .unwrap_err();

        assert!(matches!(err, NegotiationError::NotFound { .. }));
        assert!(manager.is_empty());
    }

    #[test]
    fn test_full_negotiation_flow() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        let id = n.id().as_str();

        manager.offered(id).unwrap();
        manager
            .handle_agreed(&agreement_event_message(id, "c1"))
            .unwrap();
        manager.agreed(id).unwrap();
        manager
            .handle_verified(&verification_message(id, "c1"))
            .unwrap();
        let finalized = manager.finalized(id).unwrap();

        assert_eq!(finalized.state(), NegotiationState::Finalized);
    }

    #[test]
    fn test_agreed_from_offered_is_illegal() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        manager.offered(n.id().as_str()).unwrap();

        let err = manager.agreed(n.id().as_str()).unwrap_err();

        assert!(matches!(err, NegotiationError::IllegalTransition { .. }));
        assert_eq!(
            manager.find_by_id(n.id().as_str()).unwrap().state(),
            NegotiationState::Offered
        );
    }

    #[test]
    fn test_handle_agreed_requires_event_type() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        manager.offered(n.id().as_str()).unwrap();

        let mut event = agreement_event_message(n.id().as_str(), "c1");
        event.remove(DSPACE_PROPERTY_EVENT_TYPE_EXPANDED);

        let err = manager.handle_agreed(&event).unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::RequiredFieldMissing {
                operation: "handleAgreed",
                ..
            }
        ));
    }

    #[test]
    fn test_termination_without_provider_id() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");

        let mut termination = termination_message(n.id().as_str(), "c1", "1", "cancelled");
        termination.remove(DSPACE_PROPERTY_PROVIDER_PID_EXPANDED);

        let err = manager.terminated(&termination).unwrap_err();

        assert!(matches!(
            err,
            NegotiationError::RequiredFieldMissing {
                operation: "terminated",
                ..
            }
        ));
        assert_eq!(manager.len(), 1);
        assert_eq!(
            manager.find_by_id(n.id().as_str()).unwrap().state(),
            NegotiationState::Requested
        );
    }

    #[test]
    fn test_find_by_correlation_id() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");

        assert_eq!(manager.find_by_correlation_id("c1").unwrap().id(), n.id());
        assert!(manager.find_by_correlation_id("c2").is_none());
    }

    #[test]
    fn test_find_by_id_not_found() {
        let manager = ProviderNegotiationManager::new();
        let err = manager.find_by_id("missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "findById: contract negotiation not found for id: missing"
        );
    }

    #[test]
    fn test_illegal_transition_names_operation() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        manager.offered(n.id().as_str()).unwrap();

        let err = manager.agreed(n.id().as_str()).unwrap_err();

        assert!(matches!(
            err,
            NegotiationError::IllegalTransition {
                operation: "agreed",
                ..
            }
        ));
        assert!(err.to_string().starts_with("agreed: illegal transition"));
    }

    #[test]
    fn test_invalid_callback_address_names_operation() {
        let manager = ProviderNegotiationManager::new();
        let mut message = contract_request_message("c1", "offer-1", None);
        message.insert(
            DSPACE_PROPERTY_CALLBACK_ADDRESS_EXPANDED.to_string(),
            serde_json::json!(42),
        );

        let err = manager.handle_contract_request(&message).unwrap_err();

        assert!(matches!(
            err,
            NegotiationError::InvalidProperty {
                operation: "handleContractRequest",
                ..
            }
        ));
        assert!(manager.is_empty());
    }

    struct FailingListener;

    impl NegotiationListener for FailingListener {
        fn offered(&self, _: &Negotiation) -> std::result::Result<(), ListenerError> {
            Err(ListenerError("unreachable consumer".to_string()))
        }
    }

    #[test]
    fn test_notification_failure_names_operation() {
        let manager = ProviderNegotiationManager::new();
        let n = request(&manager, "c1");
        manager.register_listener(Arc::new(FailingListener));

        let err = manager.offered(n.id().as_str()).unwrap_err();

        assert_eq!(
            err.to_string(),
            format!(
                "offered: listener failed on offered for negotiation {}: unreachable consumer",
                n.id()
            )
        );
    }

    /// Reads the manager back from inside its callback
    struct ReadBackListener {
        manager: std::sync::Weak<ProviderNegotiationManager>,
        seen: Mutex<Vec<(NegotiationState, usize, bool)>>,
    }

    impl NegotiationListener for ReadBackListener {
        fn offered(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
            let manager = self
                .manager
                .upgrade()
                .ok_or_else(|| ListenerError("manager dropped".to_string()))?;
            let found = manager
                .find_by_id(negotiation.id().as_str())
                .map_err(|e| ListenerError(e.to_string()))?;
            let all = manager.negotiations().len();
            let by_correlation = manager
                .find_by_correlation_id(negotiation.correlation_id())
                .is_some();
            self.seen.lock().push((found.state(), all, by_correlation));
            Ok(())
        }
    }

    #[test]
    fn test_listener_can_read_manager_during_notification() {
        let manager = Arc::new(ProviderNegotiationManager::new());
        let listener = Arc::new(ReadBackListener {
            manager: Arc::downgrade(&manager),
            seen: Mutex::new(Vec::new()),
        });
        manager.register_listener(listener.clone());
        let n = request(&manager, "c1");

        let (tx, rx) = std::sync::mpsc::channel();
        let worker = {
            let manager = manager.clone();
            let id = n.id().to_string();
            std::thread::spawn(move || {
                let result = manager.offered(&id).map(|n| n.state());
                let _ = tx.send(result);
            })
        };

        let result = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("offered did not complete while the listener read the manager back");
        worker.join().unwrap();

        assert_eq!(result.unwrap(), NegotiationState::Offered);
        assert_eq!(
            *listener.seen.lock(),
            vec![(NegotiationState::Offered, 1, true)]
        );
    }
}

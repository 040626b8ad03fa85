//! Observers notified of committed negotiation transitions

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::record::Negotiation;
use crate::error::{ListenerError, NegotiationError, Result};

/// Events fanned out to listeners
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NegotiationEvent {
    ContractRequested,
    Offered,
    Agreed,
    Verified,
    Finalized,
    Terminated,
}

impl NegotiationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            NegotiationEvent::ContractRequested => "contractRequested",
            NegotiationEvent::Offered => "offered",
            NegotiationEvent::Agreed => "agreed",
            NegotiationEvent::Verified => "verified",
            NegotiationEvent::Finalized => "finalized",
            NegotiationEvent::Terminated => "terminated",
        }
    }

    fn dispatch(
        &self,
        listener: &dyn NegotiationListener,
        negotiation: &Negotiation,
    ) -> std::result::Result<(), ListenerError> {
        match self {
            NegotiationEvent::ContractRequested => listener.contract_requested(negotiation),
            NegotiationEvent::Offered => listener.offered(negotiation),
            NegotiationEvent::Agreed => listener.agreed(negotiation),
            NegotiationEvent::Verified => listener.verified(negotiation),
            NegotiationEvent::Finalized => listener.finalized(negotiation),
            NegotiationEvent::Terminated => listener.terminated(negotiation),
        }
    }
}

impl fmt::Display for NegotiationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Receives a callback for every committed negotiation transition.
///
/// Callbacks run after the new state is committed and may read the manager
/// back. They run inside the negotiation's flow, so an implementation must
/// not drive another transition of the same negotiation.
#[allow(unused_variables)]
pub trait NegotiationListener: Send + Sync {
    fn contract_requested(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    fn offered(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    fn agreed(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    fn verified(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    fn finalized(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    fn terminated(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        Ok(())
    }
}

fn same_listener(a: &Arc<dyn NegotiationListener>, b: &Arc<dyn NegotiationListener>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Registered listeners in registration order
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: RwLock<Vec<Arc<dyn NegotiationListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn NegotiationListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove a listener by identity; returns false if it was not registered
    pub fn deregister(&self, listener: &Arc<dyn NegotiationListener>) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| same_listener(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Copy of the current listener list, taken without holding the lock during fan-out
    pub fn snapshot(&self) -> Vec<Arc<dyn NegotiationListener>> {
        self.listeners.read().clone()
    }

    /// Deliver `event` to every listener present when the call starts.
    ///
    /// All listeners are called even if one fails; the first failure is returned.
    pub fn notify(&self, event: NegotiationEvent, negotiation: &Negotiation) -> Result<()> {
        let mut first_failure = None;

        for listener in self.snapshot() {
            if let Err(e) = event.dispatch(listener.as_ref(), negotiation) {
                tracing::warn!(
                    "Listener failed on {} for negotiation {}: {}",
                    event,
                    negotiation.id(),
                    e
                );
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(NegotiationError::NotificationFailed {
                operation: "notify",
                id: negotiation.id().to_string(),
                event: event.name(),
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A notification delivered through a [`ChannelListener`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RecordedEvent {
    pub event: NegotiationEvent,
    pub negotiation: Negotiation,
}

/// Forwards every event to an unbounded channel for asynchronous consumers
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<RecordedEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RecordedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(
        &self,
        event: NegotiationEvent,
        negotiation: &Negotiation,
    ) -> std::result::Result<(), ListenerError> {
        self.tx
            .send(RecordedEvent {
                event,
                negotiation: negotiation.clone(),
            })
            .map_err(|_| ListenerError("event receiver dropped".to_string()))
    }
}

impl NegotiationListener for ChannelListener {
    fn contract_requested(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::ContractRequested, negotiation)
    }

    fn offered(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::Offered, negotiation)
    }

    fn agreed(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::Agreed, negotiation)
    }

    fn verified(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::Verified, negotiation)
    }

    fn finalized(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::Finalized, negotiation)
    }

    fn terminated(&self, negotiation: &Negotiation) -> std::result::Result<(), ListenerError> {
        self.forward(NegotiationEvent::Terminated, negotiation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<NegotiationEvent>>,
    }

    impl NegotiationListener for Recorder {
        fn offered(&self, _: &Negotiation) -> std::result::Result<(), ListenerError> {
            self.events.lock().push(NegotiationEvent::Offered);
            Ok(())
        }
    }

    struct Failing;

    impl NegotiationListener for Failing {
        fn offered(&self, _: &Negotiation) -> std::result::Result<(), ListenerError> {
            Err(ListenerError("boom".to_string()))
        }
    }

    fn negotiation() -> Negotiation {
        Negotiation::new("c1", "offer-1", None)
    }

    #[test]
    fn test_register_and_notify() {
        let registry = ListenerRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.register(recorder.clone());

        registry
            .notify(NegotiationEvent::Offered, &negotiation())
            .unwrap();

        assert_eq!(*recorder.events.lock(), vec![NegotiationEvent::Offered]);
    }

    #[test]
    fn test_unhandled_events_default_to_ok() {
        let registry = ListenerRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.register(recorder.clone());

        registry
            .notify(NegotiationEvent::Verified, &negotiation())
            .unwrap();

        assert!(recorder.events.lock().is_empty());
    }

    #[test]
    fn test_deregister_by_identity() {
        let registry = ListenerRegistry::new();
        let first: Arc<dyn NegotiationListener> = Arc::new(Recorder::default());
        let second: Arc<dyn NegotiationListener> = Arc::new(Recorder::default());
        registry.register(first.clone());
        registry.register(second.clone());

        assert!(registry.deregister(&first));
        assert!(!registry.deregister(&first));
        assert_eq!(registry.len(), 1);
        assert!(same_listener(&registry.snapshot()[0], &second));
    }

    #[test]
    fn test_failure_does_not_skip_later_listeners() {
        let registry = ListenerRegistry::new();
        let recorder = Arc::new(Recorder::default());
        registry.register(Arc::new(Failing));
        registry.register(recorder.clone());

        let result = registry.notify(NegotiationEvent::Offered, &negotiation());

        assert!(matches!(
            result,
            Err(NegotiationError::NotificationFailed { event: "offered", .. })
        ));
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[test]
    fn test_channel_listener_forwards() {
        let (listener, mut rx) = ChannelListener::new();
        let n = negotiation();

        listener.terminated(&n).unwrap();

        let received = tokio_test::block_on(rx.recv()).unwrap();
        assert_eq!(received.event, NegotiationEvent::Terminated);
        assert_eq!(received.negotiation.id(), n.id());
    }

    #[test]
    fn test_channel_listener_fails_without_receiver() {
        let (listener, rx) = ChannelListener::new();
        drop(rx);
        assert!(listener.offered(&negotiation()).is_err());
    }
}

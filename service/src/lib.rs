use config::Config;
use delivery::{DeliveryWorker, Dispatcher, FailureStore, FailureSurfacer, RetryPolicy};
use events::EventPublisher;
use sse::domain_event_handler::SseDomainEventHandler;
use sse::presence::PresenceTracker;
use sse::session::CredentialVerifier;
use sse::Manager;
use std::sync::Arc;

pub mod config;
pub mod logging;

// Service-level state containing the delivery-core infrastructure.
// Needs to implement Clone to be able to be passed into Router as State.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Fan-out broadcaster for server-push events.
    pub broadcaster: Arc<Manager>,
    /// Derived online/offline view over the broadcaster's registry.
    pub presence: PresenceTracker,
    /// Auth collaborator used by the stream handshake (injected).
    pub verifier: Arc<dyn CredentialVerifier>,
    /// Retry wrapper for outbound provider calls.
    pub delivery_worker: Arc<DeliveryWorker>,
    /// Terminal-failure bookkeeping and notifications.
    pub failure_surfacer: Arc<FailureSurfacer>,
    /// Fire-and-forget delivery entry point for domain producers.
    pub dispatcher: Arc<Dispatcher>,
    /// Domain producers publish here; the SSE handler is pre-registered.
    pub event_publisher: EventPublisher,
}

impl AppState {
    pub fn new(
        config: Config,
        verifier: Arc<dyn CredentialVerifier>,
        failure_store: Arc<dyn FailureStore>,
    ) -> Self {
        let broadcaster = Arc::new(Manager::new());
        let presence = broadcaster.presence();
        let event_publisher = EventPublisher::new()
            .with_handler(Arc::new(SseDomainEventHandler::new(broadcaster.clone())));
        let delivery_worker = Arc::new(DeliveryWorker::new(RetryPolicy::new(config.retry_config())));
        let failure_surfacer = Arc::new(FailureSurfacer::new(failure_store, broadcaster.clone()));
        let dispatcher = Arc::new(Dispatcher::new(
            delivery_worker.clone(),
            failure_surfacer.clone(),
        ));

        Self {
            config,
            broadcaster,
            presence,
            verifier,
            delivery_worker,
            failure_surfacer,
            dispatcher,
            event_publisher,
        }
    }
}

//! Surfacing terminal delivery failures into durable records and the live
//! notification stream.

use crate::error::Error;
use async_trait::async_trait;
use dashmap::DashMap;
use log::*;
use sse::message::{Event, Message, MessageScope};
use sse::Manager;
use std::sync::Arc;

/// A subject's failure state as the durable store keeps it.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureRecord {
    pub subject_id: String,
    pub error_summary: String,
    pub is_active: bool,
}

/// Boundary contract for the durable failure store collaborator. The store
/// owns atomicity of upsert-by-subject; at most one record exists per
/// subject.
#[async_trait]
pub trait FailureStore: Send + Sync {
    /// Create or refresh the active failure record for a subject.
    async fn upsert(&self, subject_id: &str, error_summary: &str) -> Result<(), Error>;
    /// Deactivate the subject's failure record after a successful delivery.
    async fn clear(&self, subject_id: &str) -> Result<(), Error>;
}

/// DashMap-backed store used in the default wiring and in tests until a
/// durable collaborator is plugged in.
#[derive(Default)]
pub struct InMemoryFailureStore {
    records: DashMap<String, FailureRecord>,
}

impl InMemoryFailureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, subject_id: &str) -> Option<FailureRecord> {
        self.records.get(subject_id).map(|r| r.value().clone())
    }

    pub fn active_count(&self) -> usize {
        self.records.iter().filter(|r| r.value().is_active).count()
    }
}

#[async_trait]
impl FailureStore for InMemoryFailureStore {
    async fn upsert(&self, subject_id: &str, error_summary: &str) -> Result<(), Error> {
        self.records.insert(
            subject_id.to_string(),
            FailureRecord {
                subject_id: subject_id.to_string(),
                error_summary: error_summary.to_string(),
                is_active: true,
            },
        );
        Ok(())
    }

    async fn clear(&self, subject_id: &str) -> Result<(), Error> {
        if let Some(mut record) = self.records.get_mut(subject_id) {
            record.is_active = false;
        }
        Ok(())
    }
}

/// Turns a terminal delivery failure into a durable record plus a live
/// notification, and withdraws both when a later delivery for the same
/// subject succeeds.
///
/// The two side effects are independent: a store failure is logged and the
/// notification is still attempted, and vice versa the notification path
/// never reports errors at all (broadcast is fire-and-forget).
pub struct FailureSurfacer {
    store: Arc<dyn FailureStore>,
    broadcaster: Arc<Manager>,
    /// In-process view of subjects with a standing failure, so dispatch can
    /// decide whether a success is a recovery. The store stays the durable
    /// source of truth.
    active: DashMap<String, ()>,
}

impl FailureSurfacer {
    pub fn new(store: Arc<dyn FailureStore>, broadcaster: Arc<Manager>) -> Self {
        Self {
            store,
            broadcaster,
            active: DashMap::new(),
        }
    }

    /// Whether this process has surfaced a failure for the subject that has
    /// not been withdrawn yet.
    pub fn has_active_failure(&self, subject_id: &str) -> bool {
        self.active.contains_key(subject_id)
    }

    /// Record the failure (upsert by subject, so repeated failures for a
    /// still-failing subject keep one record) and notify the audience.
    pub async fn on_terminal_failure(&self, subject_id: &str, scope: MessageScope, error: &Error) {
        let summary = error.summary();
        warn!("Terminal delivery failure for subject {subject_id}: {summary}");
        self.active.insert(subject_id.to_string(), ());

        if let Err(store_error) = self.store.upsert(subject_id, &summary).await {
            error!("Failed to persist failure record for subject {subject_id}: {store_error}");
        }

        self.broadcaster.send_message(Message {
            event: Event::DeliveryFailed {
                subject_id: subject_id.to_string(),
                error_summary: summary,
            },
            scope,
        });
    }

    /// Clear the subject's failure record and tell clients to drop the
    /// stale notification.
    pub async fn on_recovery_success(&self, subject_id: &str, scope: MessageScope) {
        info!("Delivery for subject {subject_id} recovered");
        self.active.remove(subject_id);

        if let Err(store_error) = self.store.clear(subject_id).await {
            error!("Failed to clear failure record for subject {subject_id}: {store_error}");
        }

        self.broadcaster.send_message(Message {
            event: Event::NotificationWithdrawn {
                subject_id: subject_id.to_string(),
            },
            scope,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;
    use tokio::sync::mpsc;

    struct BrokenStore;

    #[async_trait]
    impl FailureStore for BrokenStore {
        async fn upsert(&self, _subject_id: &str, _error_summary: &str) -> Result<(), Error> {
            Err(Error::other("store unreachable"))
        }
        async fn clear(&self, _subject_id: &str) -> Result<(), Error> {
            Err(Error::other("store unreachable"))
        }
    }

    #[tokio::test]
    async fn failure_then_recovery_cycles_record_and_notifications() {
        let store = Arc::new(InMemoryFailureStore::new());
        let broadcaster = Arc::new(Manager::new());
        let surfacer = FailureSurfacer::new(store.clone(), broadcaster.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register_connection("operator".to_string(), tx);
        while rx.try_recv().is_ok() {}

        let scope = MessageScope::Recipient {
            recipient_id: "operator".to_string(),
        };
        surfacer
            .on_terminal_failure(
                "report-17",
                scope.clone(),
                &Error::network(NetworkErrorKind::Timeout),
            )
            .await;

        let record = store.get("report-17").expect("record should exist");
        assert!(record.is_active);
        assert_eq!(record.error_summary, "provider call timed out");

        surfacer.on_recovery_success("report-17", scope).await;
        let record = store.get("report-17").expect("record should exist");
        assert!(!record.is_active);

        // The failure notification arrived before its withdrawal.
        let first = rx.try_recv().expect("failure notification");
        let second = rx.try_recv().expect("withdrawal notification");
        assert_eq!(first.name(), "delivery-failed");
        assert_eq!(first.payload()["subjectId"], "report-17");
        assert_eq!(second.name(), "notification-withdrawn");
        assert_eq!(second.payload()["subjectId"], "report-17");
    }

    #[tokio::test]
    async fn repeated_failures_keep_a_single_record_per_subject() {
        let store = Arc::new(InMemoryFailureStore::new());
        let broadcaster = Arc::new(Manager::new());
        let surfacer = FailureSurfacer::new(store.clone(), broadcaster);

        for _ in 0..3 {
            surfacer
                .on_terminal_failure(
                    "report-17",
                    MessageScope::Broadcast,
                    &Error::network(NetworkErrorKind::Unreachable),
                )
                .await;
        }

        assert_eq!(store.active_count(), 1);
    }

    #[tokio::test]
    async fn store_failure_does_not_block_the_notification() {
        let broadcaster = Arc::new(Manager::new());
        let surfacer = FailureSurfacer::new(Arc::new(BrokenStore), broadcaster.clone());

        let (tx, mut rx) = mpsc::unbounded_channel();
        broadcaster.register_connection("operator".to_string(), tx);
        while rx.try_recv().is_ok() {}

        surfacer
            .on_terminal_failure(
                "report-17",
                MessageScope::Broadcast,
                &Error::provider("payload rejected"),
            )
            .await;

        let received = rx.try_recv().expect("notification still sent");
        assert_eq!(received.name(), "delivery-failed");
    }
}

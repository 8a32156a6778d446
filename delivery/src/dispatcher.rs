//! Fire-and-forget dispatch of outbound deliveries.

use crate::error::Error;
use crate::surfacer::FailureSurfacer;
use crate::worker::DeliveryWorker;
use sse::message::MessageScope;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Runs each delivery on its own task so a slow or failing provider never
/// shares a call stack with the operation that triggered the send.
///
/// The outcome is consumed here, not returned: a terminal failure goes to
/// the surfacer, and a success for a subject with an active failure record
/// withdraws that record. Callers that need the result synchronously should
/// use [`DeliveryWorker::send`] directly instead.
pub struct Dispatcher {
    worker: Arc<DeliveryWorker>,
    surfacer: Arc<FailureSurfacer>,
}

impl Dispatcher {
    pub fn new(worker: Arc<DeliveryWorker>, surfacer: Arc<FailureSurfacer>) -> Self {
        Self { worker, surfacer }
    }

    /// Spawn the delivery. The returned handle is only for callers that want
    /// to await completion (tests, shutdown paths); dropping it detaches the
    /// task.
    pub fn dispatch<T, F, Fut>(
        &self,
        subject_id: impl Into<String>,
        scope: MessageScope,
        label: impl Into<String>,
        action: F,
    ) -> JoinHandle<()>
    where
        T: Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let worker = self.worker.clone();
        let surfacer = self.surfacer.clone();
        let subject_id = subject_id.into();
        let label = label.into();

        tokio::spawn(async move {
            match worker.send(&label, action).await {
                Ok(_) => {
                    // A resend that succeeds withdraws the subject's standing
                    // failure notification; a plain success changes nothing.
                    if surfacer.has_active_failure(&subject_id) {
                        surfacer.on_recovery_success(&subject_id, scope).await;
                    }
                }
                Err(error) => {
                    surfacer
                        .on_terminal_failure(&subject_id, scope, &error)
                        .await;
                }
            }
        })
    }
}

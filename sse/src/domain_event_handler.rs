use crate::message::{Event as SseEvent, Message as SseMessage, MessageScope};
use crate::Manager;
use async_trait::async_trait;
use events::{DomainEvent, EventHandler};
use log::*;
use serde_json::json;
use std::sync::Arc;

/// Handles domain events by converting them to SSE messages and routing them
/// to the affected recipients.
///
/// The domain layer determines which users should be notified and includes
/// their IDs in the event. This handler simply routes the SSE messages.
pub struct SseDomainEventHandler {
    sse_manager: Arc<Manager>,
}

impl SseDomainEventHandler {
    pub fn new(sse_manager: Arc<Manager>) -> Self {
        Self { sse_manager }
    }

    /// Send an SSE message to all specified users.
    fn send_to_users(&self, sse_event: SseEvent, user_ids: &[events::Id]) {
        for user_id in user_ids {
            self.sse_manager.send_message(SseMessage {
                event: sse_event.clone(),
                scope: MessageScope::Recipient {
                    recipient_id: user_id.to_string(),
                },
            });
        }

        debug!(
            "Sent SSE event to {} user(s): {:?}",
            user_ids.len(),
            user_ids
        );
    }
}

#[async_trait]
impl EventHandler for SseDomainEventHandler {
    async fn handle(&self, event: &DomainEvent) {
        match event {
            DomainEvent::ReportFiled {
                report_id,
                report,
                notify_user_ids,
            } => {
                debug!("Handling ReportFiled event for report {}", report_id);

                let sse_event = SseEvent::Domain {
                    name: "report-filed".to_string(),
                    payload: json!({
                        "reportId": report_id.to_string(),
                        "report": report,
                    }),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }

            DomainEvent::ReportUpdated {
                report_id,
                report,
                notify_user_ids,
            } => {
                debug!("Handling ReportUpdated event for report {}", report_id);

                let sse_event = SseEvent::Domain {
                    name: "report-updated".to_string(),
                    payload: json!({
                        "reportId": report_id.to_string(),
                        "report": report,
                    }),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }

            DomainEvent::ReportArchived {
                report_id,
                notify_user_ids,
            } => {
                debug!("Handling ReportArchived event for report {}", report_id);

                let sse_event = SseEvent::Domain {
                    name: "report-archived".to_string(),
                    payload: json!({
                        "reportId": report_id.to_string(),
                    }),
                };

                self.send_to_users(sse_event, notify_user_ids);
            }
        }
    }
}

use crate::presence::PresenceStatus;
use serde_json::{json, Value};

/// Wire-level events pushed to connected clients.
///
/// The first six variants are produced by the delivery core itself and carry
/// reserved event names. `Domain` carries events from external producers;
/// their names and payloads pass through unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// First frame after a successful handshake.
    Connected { message: String },
    /// Periodic liveness frame; also forces early detection of a dead
    /// transport via the resulting write failure.
    Heartbeat { timestamp: i64 },
    /// A recipient crossed the offline/online boundary.
    PresenceChanged {
        recipient_id: String,
        status: PresenceStatus,
    },
    /// An outbound delivery exhausted its retries; shown as a persistent
    /// notification until withdrawn.
    DeliveryFailed {
        subject_id: String,
        error_summary: String,
    },
    /// A previously surfaced failure recovered; clients drop the stale
    /// notification for this subject.
    NotificationWithdrawn { subject_id: String },
    /// Terminal handshake rejection, written before the stream closes.
    Error { message: String },
    /// Producer-defined event, forwarded verbatim.
    Domain { name: String, payload: Value },
}

impl Event {
    /// The SSE `event:` field value.
    pub fn name(&self) -> &str {
        match self {
            Event::Connected { .. } => "connected",
            Event::Heartbeat { .. } => "heartbeat",
            Event::PresenceChanged { .. } => "presence-changed",
            Event::DeliveryFailed { .. } => "delivery-failed",
            Event::NotificationWithdrawn { .. } => "notification-withdrawn",
            Event::Error { .. } => "error",
            Event::Domain { name, .. } => name,
        }
    }

    /// The SSE `data:` field value, as a JSON object.
    pub fn payload(&self) -> Value {
        match self {
            Event::Connected { message } => json!({ "message": message }),
            Event::Heartbeat { timestamp } => json!({ "timestamp": timestamp }),
            Event::PresenceChanged {
                recipient_id,
                status,
            } => json!({ "recipientId": recipient_id, "status": status.as_str() }),
            Event::DeliveryFailed {
                subject_id,
                error_summary,
            } => json!({ "subjectId": subject_id, "errorSummary": error_summary }),
            Event::NotificationWithdrawn { subject_id } => json!({ "subjectId": subject_id }),
            Event::Error { message } => json!({ "message": message }),
            Event::Domain { payload, .. } => payload.clone(),
        }
    }

    /// Render into the transport frame (`event: <name>\ndata: <json>\n\n`).
    pub fn to_frame(&self) -> axum::response::sse::Event {
        axum::response::sse::Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub event: Event,
    pub scope: MessageScope,
}

#[derive(Debug, Clone)]
pub enum MessageScope {
    /// Send to all connections for a specific recipient
    Recipient { recipient_id: String },
    /// Send to all connected recipients
    Broadcast,
}

use crate::connection::{Connection, ConnectionId, ConnectionRegistry, EventSink, PresenceChange, RecipientId};
use crate::message::{Event, Message, MessageScope};
use crate::presence::{PresenceStatus, PresenceTracker};
use log::*;
use std::sync::Arc;

/// Fan-out broadcaster over the connection registry.
///
/// All sends are best-effort and synchronous within the call: for a single
/// connection, call order is write order. A failed write evicts that one
/// connection and delivery continues to the rest; errors never reach the
/// caller. Presence transitions caused by registration, unregistration, or
/// eviction are announced through the broadcaster itself.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
}

impl Manager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Shared handle to the underlying registry.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        self.registry.clone()
    }

    /// Presence view derived from this broadcaster's registry.
    pub fn presence(&self) -> PresenceTracker {
        PresenceTracker::new(self.registry.clone())
    }

    /// Register a new connection and return its unique ID. If this is the
    /// recipient's first live connection, everyone is told they came online.
    pub fn register_connection(&self, recipient_id: RecipientId, sink: EventSink) -> ConnectionId {
        let (connection_id, change) = self.registry.register(recipient_id, sink);
        debug!("Registered SSE connection {}", connection_id.as_str());
        self.announce(change);
        connection_id
    }

    /// Unregister a connection by ID. Safe to call from multiple teardown
    /// paths; only the first call for a given id has any effect.
    pub fn unregister_connection(&self, connection_id: &ConnectionId) {
        debug!("Unregistering SSE connection {}", connection_id.as_str());
        let change = self.registry.unregister(connection_id);
        self.announce(change);
    }

    /// Deliver an event to every live connection.
    pub fn send_to_all(&self, event: Event) {
        self.fan_out(self.registry.snapshot_all(), event);
    }

    /// Deliver an event to every live connection of one recipient. A
    /// recipient with no connections simply receives nothing.
    pub fn send_to_recipient(&self, recipient_id: &str, event: Event) {
        self.fan_out(self.registry.list_by_recipient(recipient_id), event);
    }

    /// Send a message based on its scope
    pub fn send_message(&self, message: Message) {
        match message.scope {
            MessageScope::Recipient { recipient_id } => {
                self.send_to_recipient(&recipient_id, message.event);
            }
            MessageScope::Broadcast => {
                self.send_to_all(message.event);
            }
        }
    }

    fn fan_out(&self, targets: Vec<(ConnectionId, Connection)>, event: Event) {
        let mut dead = Vec::new();
        for (connection_id, connection) in targets {
            if connection.sink.send(event.clone()).is_err() {
                warn!(
                    "Failed to write event to connection {}; evicting",
                    connection_id.as_str()
                );
                dead.push(connection_id);
            }
        }

        // Evict after the loop so one broken pipe cannot stall or abort
        // delivery to the surviving connections.
        for connection_id in dead {
            let change = self.registry.unregister(&connection_id);
            self.announce(change);
        }
    }

    fn announce(&self, change: PresenceChange) {
        match change {
            PresenceChange::CameOnline(recipient_id) => self.send_to_all(Event::PresenceChanged {
                recipient_id,
                status: PresenceStatus::Online,
            }),
            PresenceChange::WentOffline(recipient_id) => self.send_to_all(Event::PresenceChanged {
                recipient_id,
                status: PresenceStatus::Offline,
            }),
            PresenceChange::Unchanged => {}
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn domain_event(name: &str) -> Event {
        Event::Domain {
            name: name.to_string(),
            payload: json!({}),
        }
    }

    #[test]
    fn broadcast_survives_broken_connections() {
        let manager = Manager::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();

        manager.register_connection("alice".to_string(), tx_a);
        let broken_id = manager.register_connection("bob".to_string(), tx_b);
        manager.register_connection("carol".to_string(), tx_c);
        drop(rx_b); // bob's transport is gone
        drain(&mut rx_a);
        drain(&mut rx_c);

        manager.send_to_all(domain_event("report-filed"));

        // Survivors got the event; the broken connection is gone from the
        // registry and its recipient's offline transition was announced.
        let seen_a = drain(&mut rx_a);
        let seen_c = drain(&mut rx_c);
        for seen in [&seen_a, &seen_c] {
            assert_eq!(seen[0].name(), "report-filed");
            assert_eq!(
                seen[1],
                Event::PresenceChanged {
                    recipient_id: "bob".to_string(),
                    status: PresenceStatus::Offline,
                }
            );
        }
        assert!(!manager.registry().contains(&broken_id));
        assert_eq!(manager.registry().len(), 2);
    }

    #[test]
    fn presence_transitions_are_announced_exactly_once() {
        let manager = Manager::new();
        let (tx_observer, mut rx_observer) = mpsc::unbounded_channel();
        manager.register_connection("observer".to_string(), tx_observer);
        drain(&mut rx_observer);

        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let id1 = manager.register_connection("alice".to_string(), tx1);
        let id2 = manager.register_connection("alice".to_string(), tx2);

        // Only the first connection crossed the offline/online boundary.
        let seen = drain(&mut rx_observer);
        assert_eq!(
            seen,
            vec![Event::PresenceChanged {
                recipient_id: "alice".to_string(),
                status: PresenceStatus::Online,
            }]
        );

        manager.unregister_connection(&id1);
        assert!(drain(&mut rx_observer).is_empty());

        manager.unregister_connection(&id2);
        let seen = drain(&mut rx_observer);
        assert_eq!(
            seen,
            vec![Event::PresenceChanged {
                recipient_id: "alice".to_string(),
                status: PresenceStatus::Offline,
            }]
        );

        // Tearing the connection down again announces nothing further.
        manager.unregister_connection(&id2);
        assert!(drain(&mut rx_observer).is_empty());
    }

    #[test]
    fn recipient_scope_reaches_all_their_connections_and_nobody_else() {
        let manager = Manager::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let (tx_other, mut rx_other) = mpsc::unbounded_channel();

        manager.register_connection("alice".to_string(), tx1);
        manager.register_connection("alice".to_string(), tx2);
        manager.register_connection("bob".to_string(), tx_other);
        drain(&mut rx1);
        drain(&mut rx2);
        drain(&mut rx_other);

        manager.send_message(Message {
            event: domain_event("report-updated"),
            scope: MessageScope::Recipient {
                recipient_id: "alice".to_string(),
            },
        });

        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
        assert!(drain(&mut rx_other).is_empty());

        // Nothing queues for an absent recipient, and nothing errors.
        manager.send_to_recipient("nobody", domain_event("report-updated"));
    }

    #[test]
    fn events_arrive_in_send_order_per_connection() {
        let manager = Manager::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        manager.register_connection("alice".to_string(), tx);
        drain(&mut rx);

        manager.send_to_all(domain_event("first"));
        manager.send_to_recipient("alice", domain_event("second"));
        manager.send_to_all(domain_event("third"));

        let names: Vec<String> = drain(&mut rx)
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}

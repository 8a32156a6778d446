use crate::message::Event;
use dashmap::DashMap;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

// Type alias for recipient IDs (the web layer converts domain ids to String)
pub type RecipientId = String;

/// The write half of a connection's transport. The channel serializes
/// concurrent writers (heartbeat task, broadcasts) per connection, so frames
/// are never interleaved. A send error means the read half is gone and the
/// connection must be evicted.
pub type EventSink = UnboundedSender<Event>;

/// Unique identifier for a connection (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// One live streaming connection: the recipient it belongs to plus the sink
/// this registry entry exclusively writes to.
#[derive(Debug, Clone)]
pub struct Connection {
    pub recipient_id: RecipientId,
    pub sink: EventSink,
}

/// Presence transition caused by a registry mutation. Reported to the caller
/// so the broadcaster can announce it; the registry itself never sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceChange {
    /// First live connection for this recipient.
    CameOnline(RecipientId),
    /// Last live connection for this recipient went away.
    WentOffline(RecipientId),
    Unchanged,
}

/// Connection registry with dual indices for O(1) lookups.
///
/// Process-wide, in-memory only. Presence transitions are computed under the
/// recipient-index entry lock, so register/unregister racing for the same
/// recipient still yield exactly one online and one offline transition per
/// empty/non-empty boundary crossing.
pub struct ConnectionRegistry {
    /// Primary storage: lookup by connection_id for registration/cleanup - O(1)
    connections: DashMap<ConnectionId, Connection>,

    /// Secondary index: fast lookup by recipient_id for message routing - O(1)
    recipient_index: DashMap<RecipientId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            recipient_index: DashMap::new(),
        }
    }

    /// Register a new connection - O(1)
    pub fn register(&self, recipient_id: RecipientId, sink: EventSink) -> (ConnectionId, PresenceChange) {
        let connection_id = ConnectionId::new();

        self.connections.insert(
            connection_id.clone(),
            Connection {
                recipient_id: recipient_id.clone(),
                sink,
            },
        );

        let mut entry = self.recipient_index.entry(recipient_id.clone()).or_default();
        entry.insert(connection_id.clone());
        let change = if entry.len() == 1 {
            PresenceChange::CameOnline(recipient_id)
        } else {
            PresenceChange::Unchanged
        };
        drop(entry);

        (connection_id, change)
    }

    /// Unregister a connection - O(1). Idempotent: removing an id that is
    /// absent (already evicted, or torn down from another code path) is a
    /// no-op that reports no presence change.
    pub fn unregister(&self, connection_id: &ConnectionId) -> PresenceChange {
        let Some((_, connection)) = self.connections.remove(connection_id) else {
            return PresenceChange::Unchanged;
        };
        let recipient_id = connection.recipient_id;

        if let Some(mut entry) = self.recipient_index.get_mut(&recipient_id) {
            entry.remove(connection_id);

            if entry.is_empty() {
                drop(entry); // Release lock before removal
                self.recipient_index.remove(&recipient_id);
                return PresenceChange::WentOffline(recipient_id);
            }
        }

        PresenceChange::Unchanged
    }

    /// Current connections for one recipient, as an owned snapshot (possibly
    /// empty). No registry lock is held by the returned value.
    pub fn list_by_recipient(&self, recipient_id: &str) -> Vec<(ConnectionId, Connection)> {
        let ids: Vec<ConnectionId> = match self.recipient_index.get(recipient_id) {
            Some(set) => set.iter().cloned().collect(),
            None => return Vec::new(),
        };

        ids.into_iter()
            .filter_map(|id| {
                self.connections
                    .get(&id)
                    .map(|conn| (id.clone(), conn.value().clone()))
            })
            .collect()
    }

    /// Owned snapshot of every live connection, for all-fanout.
    pub fn snapshot_all(&self) -> Vec<(ConnectionId, Connection)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn contains(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// Whether the recipient has at least one live connection.
    pub fn is_online(&self, recipient_id: &str) -> bool {
        self.recipient_index.contains_key(recipient_id)
    }

    /// Recipients with at least one live connection right now.
    pub fn online_recipients(&self) -> HashSet<RecipientId> {
        self.recipient_index
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

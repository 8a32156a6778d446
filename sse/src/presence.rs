use crate::connection::{ConnectionRegistry, RecipientId};
use std::collections::HashSet;
use std::sync::Arc;

/// Online/offline marker carried in `presence-changed` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceStatus {
    Online,
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceStatus::Online => "online",
            PresenceStatus::Offline => "offline",
        }
    }
}

/// Read-side view of recipient presence, derived from the connection
/// registry. Never written directly: presence changes only through
/// register/unregister on the registry, and transition events are announced
/// by the broadcaster.
#[derive(Clone)]
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Whether the recipient currently has at least one live connection.
    pub fn is_online(&self, recipient_id: &str) -> bool {
        self.registry.is_online(recipient_id)
    }

    /// Snapshot of recipients that are online right now. Recipients not in
    /// the returned set are offline; callers building a full roster join
    /// this against their own user list.
    pub fn query(&self) -> HashSet<RecipientId> {
        self.registry.online_recipients()
    }
}

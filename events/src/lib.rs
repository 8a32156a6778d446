//! Event system infrastructure for the incident logging platform.
//!
//! This crate provides the event seam that keeps domain logic decoupled from
//! infrastructure concerns (like pushing live updates to connected browsers).
//!
//! # Architecture
//!
//! - **DomainEvent**: Enum representing business events in the system
//! - **EventHandler**: Trait for implementing event handlers
//! - **EventPublisher**: Publishes events to registered handlers
//!
//! This crate has no dependencies on internal crates, avoiding circular
//! dependencies. Entity data is carried as serialized JSON values.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// A type alias that represents any entity's internal id field data type.
pub type Id = Uuid;

/// Domain events that represent business-level changes in the system.
/// These events are emitted when domain operations complete successfully.
///
/// Events include user IDs for notification routing. The domain layer is
/// responsible for determining which users should be notified.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// Emitted when a new incident report is filed.
    ReportFiled {
        /// ID of the newly filed report.
        report_id: Id,
        /// Complete serialized report entity, sent to the frontend so it can
        /// update without a follow-up API call.
        report: Value,
        /// User IDs to receive live notifications (determined by the domain
        /// layer from the report's assignment and watchers).
        notify_user_ids: Vec<Id>,
    },
    /// Emitted when an existing report is modified (status, fields, assignee).
    ReportUpdated {
        report_id: Id,
        /// Complete updated report entity with all current field values.
        report: Value,
        notify_user_ids: Vec<Id>,
    },
    /// Emitted when a report is moved to the archive.
    ReportArchived {
        /// ID of the archived report (full entity not included; the frontend
        /// only needs to drop it from active views).
        report_id: Id,
        notify_user_ids: Vec<Id>,
    },
}

/// Trait for handling domain events.
/// Implementations can perform side effects like sending notifications,
/// updating caches, logging, etc.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &DomainEvent);
}

/// Publishes domain events to registered handlers.
/// Handlers are called sequentially in registration order.
#[derive(Clone)]
pub struct EventPublisher {
    handlers: Arc<Vec<Arc<dyn EventHandler>>>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Vec::new()),
        }
    }

    /// Register a new event handler.
    /// Note: This creates a new publisher instance with the additional handler.
    /// Store the returned publisher in your application state.
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let mut handlers = (*self.handlers).clone();
        handlers.push(handler);
        self.handlers = Arc::new(handlers);
        self
    }

    /// Publish an event to all registered handlers.
    pub async fn publish(&self, event: DomainEvent) {
        for handler in self.handlers.iter() {
            handler.handle(&event).await;
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

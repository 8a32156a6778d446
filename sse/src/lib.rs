//! Server-Sent Events (SSE) infrastructure for real-time updates.
//!
//! This crate is the streaming half of the platform's delivery core: it
//! pushes live events to connected browser sessions and tracks which
//! recipients are currently online.
//!
//! # Architecture
//!
//! - **Multiple connections per recipient**: a user may hold several live
//!   connections (tabs, devices). All of them receive recipient-scoped
//!   events.
//! - **Dual-index registry**: O(1) lookups for both connection cleanup and
//!   recipient-scoped routing via separate DashMap indices.
//! - **Write-failure eviction**: a connection whose sink can no longer be
//!   written is removed from the registry on the spot. One broken pipe never
//!   aborts delivery to the remaining connections.
//! - **Presence**: a recipient is online iff they have at least one live
//!   connection. Transitions are announced as `presence-changed` events
//!   through the same broadcast path.
//! - **Ephemeral messages**: events are best-effort. A recipient with no
//!   live connection receives nothing and sees fresh data on next page load.
//!
//! # Message Flow
//!
//! 1. Frontend establishes an SSE connection with a bearer credential
//! 2. The handshake verifies the credential; failures close the stream with
//!    a terminal `error` frame and never register
//! 3. The open session registers in the ConnectionRegistry and starts its
//!    heartbeat task
//! 4. Domain producers send messages via [`Manager::send_message`], scoped
//!    to one recipient or broadcast to everyone
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry with dual-index architecture
//! - `manager`: fan-out broadcaster and presence announcements
//! - `message`: wire-level event and scope definitions
//! - `presence`: derived online/offline view over the registry
//! - `session`: per-connection lifecycle (handshake, heartbeat, teardown)
//! - `domain_event_handler`: bridges `events::DomainEvent` into broadcasts

pub mod connection;
pub mod domain_event_handler;
pub mod manager;
pub mod message;
pub mod presence;
pub mod session;

pub use manager::Manager;

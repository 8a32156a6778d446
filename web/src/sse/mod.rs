//! SSE HTTP handler for the web layer.
//!
//! This module contains only the Axum handler for the event-stream endpoint.
//! The core infrastructure (Manager, ConnectionRegistry, StreamSession)
//! lives in the `sse` crate.

pub mod handler;

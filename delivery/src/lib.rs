//! Outbound delivery half of the platform's delivery core.
//!
//! Wraps calls to the external messaging provider with bounded retries and
//! exponential backoff, and surfaces permanent failures back into the
//! user-facing notification stream.
//!
//! - `error`: layered error type with transient network categories
//! - `retry`: transient/terminal classification and backoff arithmetic
//! - `worker`: the retry loop around a single outbound call
//! - `surfacer`: durable failure records plus live failure notifications
//!
//! The provider itself is opaque: callers hand [`worker::DeliveryWorker`] a
//! zero-argument async action and get back success or the last error. What
//! happens to a terminal error is the caller's choice; the usual paths are
//! [`surfacer::FailureSurfacer::on_terminal_failure`] for callers that await
//! the result themselves, or [`dispatcher::Dispatcher`] for fire-and-forget
//! sends with failure surfacing built in.

pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod surfacer;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use error::{Error, ErrorKind, NetworkErrorKind};
pub use retry::{RetryConfig, RetryPolicy};
pub use surfacer::{FailureStore, FailureSurfacer, InMemoryFailureStore};
pub use worker::DeliveryWorker;

//! Error types for the `delivery` crate.
use std::error::Error as StdError;
use std::fmt;

/// Top-level delivery error type.
/// Follows the platform's layered-error pattern: a root struct holding an
/// error-kind tree plus the original error as `source`. The kind is what the
/// retry policy classifies on; the source is kept for logging and chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors from an outbound delivery attempt.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// Transport-level failure before or during the provider call.
    Network(NetworkErrorKind),
    /// The provider answered and rejected the call; the description is the
    /// provider's own wording.
    Provider(String),
    Other(String),
}

/// Transient network failure categories. Every variant is a condition that
/// can clear on its own, so all of them are retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    ConnectionReset,
    ConnectionRefused,
    DnsFailure,
    Timeout,
    Unreachable,
}

impl Error {
    pub fn network(kind: NetworkErrorKind) -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::Network(kind),
        }
    }

    pub fn network_with_source(
        kind: NetworkErrorKind,
        source: Box<dyn StdError + Send + Sync>,
    ) -> Self {
        Self {
            source: Some(source),
            error_kind: ErrorKind::Network(kind),
        }
    }

    pub fn provider(description: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::Provider(description.into()),
        }
    }

    pub fn other(description: impl Into<String>) -> Self {
        Self {
            source: None,
            error_kind: ErrorKind::Other(description.into()),
        }
    }

    /// Short human-readable summary, suitable for a durable failure record
    /// and the notification payload shown to operators.
    pub fn summary(&self) -> String {
        match &self.error_kind {
            ErrorKind::Network(kind) => match kind {
                NetworkErrorKind::ConnectionReset => "connection reset by provider".to_string(),
                NetworkErrorKind::ConnectionRefused => "connection refused by provider".to_string(),
                NetworkErrorKind::DnsFailure => "provider host could not be resolved".to_string(),
                NetworkErrorKind::Timeout => "provider call timed out".to_string(),
                NetworkErrorKind::Unreachable => "provider host unreachable".to_string(),
            },
            ErrorKind::Provider(description) => description.clone(),
            ErrorKind::Other(description) => description.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Delivery Error: {}", self.summary())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

use crate::connection::{ConnectionId, EventSink, RecipientId};
use crate::manager::Manager;
use crate::message::Event;
use async_trait::async_trait;
use chrono::Utc;
use log::*;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handshake-time rejection. Terminal: the session writes one `error` frame
/// and closes without ever registering.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthError {
    pub message: String,
}

impl AuthError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Auth Error: {}", self.message)
    }
}

impl std::error::Error for AuthError {}

/// Boundary contract for the external auth collaborator: maps a bearer
/// credential to the recipient identity it belongs to.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<RecipientId, AuthError>;
}

/// Per-connection lifecycle manager.
///
/// Lifecycle is handshaking, then open, then closed; there is no reopening.
/// An open session owns its registry entry and a heartbeat task. `close` is
/// idempotent and cancels the heartbeat exactly once, whether it is reached
/// from transport teardown, a heartbeat write failure, or the drop guard.
pub struct StreamSession {
    manager: Arc<Manager>,
    connection_id: ConnectionId,
    recipient_id: RecipientId,
    heartbeat: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl StreamSession {
    /// Verify the caller's credential and open the session. A missing or
    /// rejected credential fails the handshake; nothing is registered and no
    /// presence state is touched.
    pub async fn handshake(
        manager: Arc<Manager>,
        verifier: &dyn CredentialVerifier,
        credential: Option<&str>,
        sink: EventSink,
        heartbeat_period: Duration,
    ) -> Result<Arc<Self>, AuthError> {
        let Some(credential) = credential else {
            return Err(AuthError::new("missing bearer credential"));
        };
        let recipient_id = verifier.verify(credential).await?;
        Ok(Self::open(manager, recipient_id, sink, heartbeat_period))
    }

    /// Open a session for an already-authenticated recipient: write the
    /// initial `connected` frame, register, start the heartbeat.
    pub fn open(
        manager: Arc<Manager>,
        recipient_id: RecipientId,
        sink: EventSink,
        heartbeat_period: Duration,
    ) -> Arc<Self> {
        // Queued before registration so the client's first frame is
        // `connected`, ahead of any broadcast triggered by registering.
        let _ = sink.send(Event::Connected {
            message: "event stream established".to_string(),
        });

        let connection_id = manager.register_connection(recipient_id.clone(), sink.clone());
        info!(
            "Stream session open for recipient {} (connection {})",
            recipient_id,
            connection_id.as_str()
        );

        let session = Arc::new(Self {
            manager,
            connection_id,
            recipient_id,
            heartbeat: Mutex::new(None),
            closed: AtomicBool::new(false),
        });

        let handle = tokio::spawn(heartbeat_loop(Arc::clone(&session), sink, heartbeat_period));
        if let Ok(mut slot) = session.heartbeat.lock() {
            *slot = Some(handle);
        }

        session
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    /// Tear the session down: cancel the heartbeat, unregister, release the
    /// transport. Safe to call from multiple paths; only the first call has
    /// any effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Ok(mut slot) = self.heartbeat.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }

        self.manager.unregister_connection(&self.connection_id);
        debug!(
            "Stream session closed for recipient {} (connection {})",
            self.recipient_id,
            self.connection_id.as_str()
        );
    }
}

/// Closes the session when dropped. Owned by the response stream, so an
/// abrupt transport closure that drops the stream mid-await still tears the
/// session down.
pub struct SessionGuard {
    session: Arc<StreamSession>,
}

impl SessionGuard {
    pub fn new(session: Arc<StreamSession>) -> Self {
        Self { session }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.session.close();
    }
}

async fn heartbeat_loop(session: Arc<StreamSession>, sink: EventSink, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the connected frame already
    // proved liveness, so skip it.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let beat = Event::Heartbeat {
            timestamp: Utc::now().timestamp_millis(),
        };
        if sink.send(beat).is_err() {
            debug!(
                "Heartbeat write failed for connection {}; closing session",
                session.connection_id.as_str()
            );
            session.close();
            break;
        }
    }
}

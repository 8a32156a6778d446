use crate::auth::bearer_credential;
use ::sse::message::Event as StreamEvent;
use ::sse::session::{SessionGuard, StreamSession};
use async_stream::stream;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::sse::{Event, Sse};
use futures::stream::BoxStream;
use futures::StreamExt;
use log::*;
use serde::Deserialize;
use service::AppState;
use std::convert::Infallible;
use tokio::sync::mpsc;

#[derive(Debug, Deserialize)]
pub(crate) struct StreamParams {
    token: Option<String>,
}

/// SSE handler that establishes a long-lived connection for real-time
/// updates. The handshake verifies the caller's bearer credential; a
/// rejected handshake answers with a single terminal `error` frame and
/// never registers a connection.
pub(crate) async fn stream_handler(
    State(app_state): State<AppState>,
    Query(params): Query<StreamParams>,
    headers: HeaderMap,
) -> Sse<BoxStream<'static, Result<Event, Infallible>>> {
    let credential = bearer_credential(params.token.as_deref(), &headers);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handshake = StreamSession::handshake(
        app_state.broadcaster.clone(),
        app_state.verifier.as_ref(),
        credential.as_deref(),
        tx,
        app_state.config.heartbeat_interval(),
    )
    .await;

    let stream: BoxStream<'static, Result<Event, Infallible>> = match handshake {
        Err(auth_error) => {
            debug!("Stream handshake rejected: {auth_error}");
            let frame = StreamEvent::Error {
                message: auth_error.message,
            }
            .to_frame();
            futures::stream::once(async move { Ok(frame) }).boxed()
        }
        Ok(session) => {
            debug!(
                "Event stream established for recipient {}",
                session.recipient_id()
            );

            // The guard lives inside the stream: however the response ends,
            // dropping the stream closes the session exactly once.
            let guard = SessionGuard::new(session);
            stream! {
                let _guard = guard;
                while let Some(event) = rx.recv().await {
                    yield Ok(event.to_frame());
                }
            }
            .boxed()
        }
    };

    Sse::new(stream)
}

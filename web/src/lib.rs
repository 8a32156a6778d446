//! HTTP edge for the delivery core: the event-stream endpoint, a health
//! check, and the CORS layer. Everything stateful lives in
//! [`service::AppState`]; this crate only maps HTTP onto it.

use log::*;
use service::AppState;
use tokio::net::TcpListener;

pub mod auth;
pub(crate) mod controller;
pub mod router;
mod sse;

/// Bind the configured interface/port and serve the router until shutdown.
pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let address = format!("{interface}:{}", app_state.config.port);

    let listener = TcpListener::bind(&address).await?;
    info!("Server listening for requests on http://{address}");

    axum::serve(listener, router::define_routes(app_state)).await
}

use delivery::InMemoryFailureStore;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;
use web::auth::StaticTokenVerifier;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config);

    info!(
        "Starting incident log delivery server [{}]...",
        config.runtime_env()
    );

    let verifier = Arc::new(StaticTokenVerifier::from_entries(config.stream_tokens()));
    // Stand-in until a durable failure store collaborator is wired in.
    let failure_store = Arc::new(InMemoryFailureStore::new());
    let app_state = AppState::new(config, verifier, failure_store);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server error: {e}");
        std::process::exit(1);
    }
}

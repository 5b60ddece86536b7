use axum::Router;
use tokio::net::TcpListener;

use anyhow::anyhow;

use morning_coffee::{ServerConfig, routes, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?;
    let address = config.address();
    println!("Starting server on {address}");

    // Create application state
    let app_state = AppState::new(config).await?;

    // Background reconciliation: transcription polls and idle-call timeouts
    let _poller = app_state.spawn_poller();

    // Combine all routes: API + webhooks
    let app = Router::new()
        .merge(routes::api::create_api_router())
        .merge(routes::webhooks::create_webhook_router())
        .with_state(app_state);

    // Create listener
    let listener = TcpListener::bind(&address).await?;

    println!("Server listening on {address}");

    // Start server
    axum::serve(listener, app).await?;

    Ok(())
}

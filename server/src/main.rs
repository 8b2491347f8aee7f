//! waitlist-server binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waitlist_server::config::Config;
use waitlist_server::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "waitlist_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    let addr = config.bind_address();

    tracing::info!(
        address = %addr,
        max_connections = config.max_connections,
        "starting waitlist server"
    );

    // Database pool and migrations
    let state = AppState::connect(config).await?;

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    waitlist_server::serve(listener, state).await?;

    Ok(())
}

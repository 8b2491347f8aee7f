//! Waitlist Server - the remote authority for waitlist sync.
//!
//! Serves waitlist entries over HTTP, assigns their ids and server
//! timestamps, and notifies WebSocket subscribers of a queue whenever one of
//! its entries changes.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod websocket;

use crate::config::Config;
use crate::db::Pool;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub config: Arc<Config>,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    /// Open the configured database, run migrations and build the state.
    pub async fn connect(config: Config) -> Result<Self, sqlx::Error> {
        let pool = db::create_pool(&config.database_url, config.max_connections).await?;
        db::run_migrations(&pool).await?;

        Ok(Self {
            pool,
            config: Arc::new(config),
            conn_manager: ConnectionManager::new_shared(),
        })
    }
}

/// Build the router with all routes and layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Serve the application on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, app(state)).await
}

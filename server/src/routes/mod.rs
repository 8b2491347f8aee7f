//! HTTP route definitions.

mod entries;
mod events;
mod health;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(entries::routes())
        .merge(events::routes())
}

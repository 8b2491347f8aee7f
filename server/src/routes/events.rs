//! Push channel route.

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::Response,
    routing::get,
    Router,
};
use waitlist_engine::ScopeId;

use crate::auth::AuthUser;
use crate::handlers::handle_websocket_connection;
use crate::AppState;

/// Create push channel routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events/{queue_id}", get(events_handler))
}

/// GET /events/{queue_id} - subscribe to changes of a queue.
async fn events_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(queue_id): Path<ScopeId>,
    ws: WebSocketUpgrade,
) -> Response {
    let conn_manager = state.conn_manager.clone();
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, conn_manager, queue_id))
}

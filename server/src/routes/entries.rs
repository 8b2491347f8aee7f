//! Entry routes.

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};
use waitlist_engine::{Record, RecordId, ScopeId};

use crate::auth::AuthUser;
use crate::db::StoredEntry;
use crate::error::Result;
use crate::handlers::{handle_create, handle_get, handle_list, handle_match, handle_update};
use crate::websocket::ServerMessage;
use crate::AppState;

/// Create entry routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/entries/{queue_id}", get(list_handler))
        .route("/entry", post(create_handler))
        .route("/entry/{id}", get(get_handler).put(update_handler))
        .route("/entrymatch", post(match_handler))
}

/// GET /entries/{queue_id} - all entries of a queue.
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(queue_id): Path<ScopeId>,
) -> Result<Json<Vec<Record>>> {
    Ok(Json(handle_list(&state.pool, queue_id).await?))
}

/// GET /entry/{id} - one entry.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<RecordId>,
) -> Result<Json<Record>> {
    Ok(Json(handle_get(&state.pool, id).await?))
}

/// POST /entry - create an entry.
async fn create_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    let stored = handle_create(&state.pool, body).await?;
    Ok(Json(notify(&state, stored)))
}

/// PUT /entry/{id} - replace an entry.
async fn update_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<RecordId>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    let stored = handle_update(&state.pool, id, body).await?;
    Ok(Json(notify(&state, stored)))
}

/// POST /entrymatch - first entry equal to the body on the comparable fields.
async fn match_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(example): Json<Map<String, Value>>,
) -> Result<Json<Record>> {
    Ok(Json(handle_match(&state.pool, example).await?))
}

/// Tell subscribers of the entry's queue about the write.
fn notify(state: &AppState, stored: StoredEntry) -> Record {
    let message =
        ServerMessage::entry_changed(stored.queue_id, stored.id, Some(stored.updated_at));
    state
        .conn_manager
        .broadcast_to_queue(stored.queue_id, message);
    stored.to_record()
}

//! Entry handlers - validation, server-side stamping and matching.

use serde_json::{Map, Value};
use waitlist_engine::{coerce_to_string, CollectionSchema, Record, RecordId, ScopeId};

use crate::db::{self, Pool, StoredEntry, CREATED_AT_FIELD};
use crate::error::{AppError, Result};

/// Attributes the server owns; clients cannot set them.
const SERVER_OWNED: [&str; 4] = ["id", CREATED_AT_FIELD, "updatedAt", "updatedAtLocal"];

/// Check an incoming entry body and return its queue id with the fields to
/// store.
pub fn validate_entry(mut body: Map<String, Value>) -> Result<(ScopeId, Map<String, Value>)> {
    for key in SERVER_OWNED {
        body.remove(key);
    }

    let queue_id = coerce_to_string(body.get("entry_queue_id"))
        .trim()
        .parse::<ScopeId>()
        .map_err(|_| AppError::Validation("entry_queue_id must be an integer".into()))?;

    match body.get("entry_name") {
        Some(Value::String(name)) if !name.trim().is_empty() => {}
        _ => return Err(AppError::Validation("entry_name is required".into())),
    }

    Ok((queue_id, body))
}

/// List the entries of a queue.
pub async fn handle_list(pool: &Pool, queue_id: ScopeId) -> Result<Vec<Record>> {
    let stored = db::list_entries(pool, queue_id).await?;
    Ok(stored.iter().map(|e| e.to_record()).collect())
}

/// Fetch one entry.
pub async fn handle_get(pool: &Pool, id: RecordId) -> Result<Record> {
    db::get_entry(pool, id)
        .await?
        .map(|e| e.to_record())
        .ok_or_else(|| not_found(id))
}

/// Create an entry and return the stored row.
pub async fn handle_create(pool: &Pool, body: Map<String, Value>) -> Result<StoredEntry> {
    let (queue_id, fields) = validate_entry(body)?;
    let stored = db::insert_entry(pool, queue_id, &fields, db::write_time()).await?;

    tracing::debug!(entry_id = stored.id, queue_id, "entry created");
    Ok(stored)
}

/// Replace an entry and return the stored row.
pub async fn handle_update(
    pool: &Pool,
    id: RecordId,
    body: Map<String, Value>,
) -> Result<StoredEntry> {
    let (queue_id, fields) = validate_entry(body)?;
    let stored = db::update_entry(pool, id, queue_id, &fields, db::write_time())
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::debug!(entry_id = id, queue_id, "entry updated");
    Ok(stored)
}

/// Find the first entry equal to the example on every entry comparable field.
pub async fn handle_match(pool: &Pool, example: Map<String, Value>) -> Result<Record> {
    let example = Record::from_fields(example);
    let queue_id = coerce_to_string(example.get("entry_queue_id"))
        .trim()
        .parse::<ScopeId>()
        .ok();

    let candidates = match queue_id {
        Some(queue_id) => db::list_entries(pool, queue_id).await?,
        None => db::all_entries(pool).await?,
    };

    let reconciler = CollectionSchema::entries().reconciler();
    candidates
        .iter()
        .map(|e| e.to_record())
        .find(|record| reconciler.matches(&example, record))
        .ok_or_else(|| AppError::NotFound("no matching entry".into()))
}

fn not_found(id: RecordId) -> AppError {
    AppError::NotFound(format!("entry {} not found", id))
}

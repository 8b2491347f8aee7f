//! Database operations for the entries table.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::Row;
use waitlist_engine::clock::format_timestamp;
use waitlist_engine::{Record, RecordId, ScopeId};

use super::Pool;

/// Field carrying the creation time in served records.
pub const CREATED_AT_FIELD: &str = "createdAt";

/// A stored entry row from the database.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub id: RecordId,
    pub queue_id: ScopeId,
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredEntry {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let Json(fields) = row.try_get::<Json<Map<String, Value>>, _>("fields")?;
        Ok(StoredEntry {
            id: row.try_get("id")?,
            queue_id: row.try_get("queue_id")?,
            fields,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl StoredEntry {
    /// Convert the row to the record served to clients.
    pub fn to_record(&self) -> Record {
        let mut record = Record::from_fields(self.fields.clone())
            .with_id(self.id)
            .with_field(CREATED_AT_FIELD, Value::String(format_timestamp(&self.created_at)));
        record.updated_at = Some(self.updated_at);
        record
    }
}

/// Server write time, truncated to what the wire format carries.
pub fn write_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Get all entries of a queue, ordered by id.
pub async fn list_entries(pool: &Pool, queue_id: ScopeId) -> Result<Vec<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT id, queue_id, fields, created_at, updated_at
        FROM entries
        WHERE queue_id = ?
        ORDER BY id
        "#,
    )
    .bind(queue_id)
    .fetch_all(pool)
    .await
}

/// Get every entry, ordered by id.
pub async fn all_entries(pool: &Pool) -> Result<Vec<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT id, queue_id, fields, created_at, updated_at
        FROM entries
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Get an entry by id.
pub async fn get_entry(pool: &Pool, id: RecordId) -> Result<Option<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        SELECT id, queue_id, fields, created_at, updated_at
        FROM entries
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Insert a new entry; the database assigns its id.
pub async fn insert_entry(
    pool: &Pool,
    queue_id: ScopeId,
    fields: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<StoredEntry, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        INSERT INTO entries (queue_id, fields, created_at, updated_at)
        VALUES (?, ?, ?, ?)
        RETURNING id, queue_id, fields, created_at, updated_at
        "#,
    )
    .bind(queue_id)
    .bind(Json(fields))
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Replace the fields of an existing entry.
///
/// Returns `None` when no entry has the given id.
pub async fn update_entry(
    pool: &Pool,
    id: RecordId,
    queue_id: ScopeId,
    fields: &Map<String, Value>,
    now: DateTime<Utc>,
) -> Result<Option<StoredEntry>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntry>(
        r#"
        UPDATE entries
        SET queue_id = ?, fields = ?, updated_at = ?
        WHERE id = ?
        RETURNING id, queue_id, fields, created_at, updated_at
        "#,
    )
    .bind(queue_id)
    .bind(Json(fields))
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Count stored entries.
pub async fn count_entries(pool: &Pool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM entries")
        .fetch_one(pool)
        .await
}

//! Event log repository. Rows are append-only: `create` is the only write.

use netrecon_models::event::EventLog;
use sqlx::SqlitePool;

/// Insert a new event, returning it with `id` filled in from the
/// auto-increment primary key.
pub async fn create(pool: &SqlitePool, event: &EventLog) -> Result<EventLog, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO event_logs (type, description, device_id, duration_seconds,
            created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.event_type)
    .bind(&event.description)
    .bind(&event.device_id)
    .bind(event.duration_seconds)
    .bind(&event.created_at)
    .bind(&event.updated_at)
    .execute(pool)
    .await?;
    Ok(EventLog {
        id: result.last_insert_rowid(),
        ..event.clone()
    })
}

pub async fn list_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<EventLog>, sqlx::Error> {
    sqlx::query_as::<_, EventLog>("SELECT * FROM event_logs ORDER BY created_at DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await
}

pub async fn list_by_device(pool: &SqlitePool, device_id: &str) -> Result<Vec<EventLog>, sqlx::Error> {
    sqlx::query_as::<_, EventLog>(
        "SELECT * FROM event_logs WHERE device_id = ? ORDER BY created_at DESC",
    )
    .bind(device_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_type(pool: &SqlitePool, event_type: &str) -> Result<Vec<EventLog>, sqlx::Error> {
    sqlx::query_as::<_, EventLog>(
        "SELECT * FROM event_logs WHERE type = ? ORDER BY created_at DESC",
    )
    .bind(event_type)
    .fetch_all(pool)
    .await
}

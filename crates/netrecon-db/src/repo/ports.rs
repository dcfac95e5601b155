//! Port repository.

use netrecon_models::port::Port;
use sqlx::SqlitePool;

pub async fn list_by_device(pool: &SqlitePool, device_id: &str) -> Result<Vec<Port>, sqlx::Error> {
    sqlx::query_as::<_, Port>("SELECT * FROM ports WHERE device_id = ? ORDER BY CAST(number AS INTEGER)")
        .bind(device_id)
        .fetch_all(pool)
        .await
}

pub async fn upsert(pool: &SqlitePool, port: &Port) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ports (id, device_id, number, protocol, state, service)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(device_id, number, protocol) DO UPDATE SET
           state = excluded.state,
           service = excluded.service",
    )
    .bind(&port.id)
    .bind(&port.device_id)
    .bind(&port.number)
    .bind(&port.protocol)
    .bind(&port.state)
    .bind(&port.service)
    .execute(pool)
    .await?;
    Ok(())
}

/// Replace the full port set for a device: delete every existing row, then
/// insert the new set. Matches §4.1's "replaced only if the incoming slice
/// is non-empty" contract — callers must not invoke this with an empty
/// `ports` when they mean "leave existing alone".
pub async fn replace_for_device(
    pool: &SqlitePool,
    device_id: &str,
    ports: &[Port],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM ports WHERE device_id = ?")
        .bind(device_id)
        .execute(&mut *tx)
        .await?;
    for port in ports {
        sqlx::query(
            "INSERT INTO ports (id, device_id, number, protocol, state, service)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&port.id)
        .bind(device_id)
        .bind(&port.number)
        .bind(&port.protocol)
        .bind(&port.state)
        .bind(&port.service)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn delete_for_device(pool: &SqlitePool, device_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM ports WHERE device_id = ?")
        .bind(device_id)
        .execute(pool)
        .await?;
    Ok(())
}

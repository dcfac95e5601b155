//! WebService repository.

use netrecon_models::web_service::WebService;
use sqlx::SqlitePool;

pub async fn list_by_device(pool: &SqlitePool, device_id: &str) -> Result<Vec<WebService>, sqlx::Error> {
    sqlx::query_as::<_, WebService>("SELECT * FROM web_services WHERE device_id = ? ORDER BY scanned_at DESC")
        .bind(device_id)
        .fetch_all(pool)
        .await
}

/// Replace the full web-service set for a device, matching the Web
/// Prober's "replace the device's web_services list with the newly
/// collected set" contract (§4.8).
pub async fn replace_for_device(
    pool: &SqlitePool,
    device_id: &str,
    services: &[WebService],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM web_services WHERE device_id = ?")
        .bind(device_id)
        .execute(&mut *tx)
        .await?;
    for ws in services {
        sqlx::query(
            "INSERT INTO web_services (id, device_id, url, title, server, status_code,
                content_type, size, screenshot, port, protocol, scanned_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&ws.id)
        .bind(device_id)
        .bind(&ws.url)
        .bind(&ws.title)
        .bind(&ws.server)
        .bind(ws.status_code)
        .bind(&ws.content_type)
        .bind(ws.size)
        .bind(&ws.screenshot)
        .bind(&ws.port)
        .bind(&ws.protocol)
        .bind(&ws.scanned_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await
}

pub async fn delete_for_device(pool: &SqlitePool, device_id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM web_services WHERE device_id = ?")
        .bind(device_id)
        .execute(pool)
        .await?;
    Ok(())
}

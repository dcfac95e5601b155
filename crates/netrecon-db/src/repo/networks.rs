//! Network repository.

use netrecon_models::error::{CoreError, Result};
use netrecon_models::network::Network;
use sqlx::SqlitePool;

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> Result<Network> {
    sqlx::query_as::<_, Network>("SELECT * FROM networks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?
        .ok_or_else(|| CoreError::NotFound(format!("network {id}")))
}

pub async fn find_by_cidr(pool: &SqlitePool, cidr: &str) -> Result<Network> {
    sqlx::query_as::<_, Network>("SELECT * FROM networks WHERE cidr = ?")
        .bind(cidr)
        .fetch_optional(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?
        .ok_or_else(|| CoreError::NotFound(format!("network with cidr {cidr}")))
}

pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Network>> {
    sqlx::query_as::<_, Network>("SELECT * FROM networks ORDER BY created_at")
        .fetch_all(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))
}

/// Upsert by id, preserving `created_at` on update.
pub async fn create_or_update(pool: &SqlitePool, network: &Network) -> Result<()> {
    sqlx::query(
        "INSERT INTO networks (id, name, cidr, description, status, last_scanned_at,
            device_count, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            cidr = excluded.cidr,
            description = excluded.description,
            status = excluded.status,
            last_scanned_at = excluded.last_scanned_at,
            device_count = excluded.device_count,
            updated_at = excluded.updated_at",
    )
    .bind(&network.id)
    .bind(&network.name)
    .bind(&network.cidr)
    .bind(&network.description)
    .bind(&network.status)
    .bind(&network.last_scanned_at)
    .bind(network.device_count)
    .bind(&network.created_at)
    .bind(&network.updated_at)
    .execute(pool)
    .await
    .map_err(|e| CoreError::Other(e.to_string()))?;
    Ok(())
}

/// Delete a network. Fails with `Conflict` if any device still references
/// it (§4.1).
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<()> {
    let count = super::devices::count_by_network(pool, id)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    if count > 0 {
        return Err(CoreError::Conflict(format!(
            "network {id} still has {count} device(s)"
        )));
    }
    let result = sqlx::query("DELETE FROM networks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    if result.rows_affected() == 0 {
        return Err(CoreError::NotFound(format!("network {id}")));
    }
    Ok(())
}

pub async fn set_device_count(pool: &SqlitePool, id: &str, count: i64, now: &str) -> Result<()> {
    sqlx::query("UPDATE networks SET device_count = ?, updated_at = ? WHERE id = ?")
        .bind(count)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    Ok(())
}

pub async fn set_status(pool: &SqlitePool, id: &str, status: &str, now: &str) -> Result<()> {
    sqlx::query("UPDATE networks SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    Ok(())
}

pub async fn set_last_scanned(pool: &SqlitePool, id: &str, last_scanned_at: &str) -> Result<()> {
    sqlx::query("UPDATE networks SET last_scanned_at = ?, updated_at = ? WHERE id = ?")
        .bind(last_scanned_at)
        .bind(last_scanned_at)
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    Ok(())
}

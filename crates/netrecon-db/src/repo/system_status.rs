//! System status repository. A fresh row (with its `local_devices` child
//! row) is inserted at the top of each scan loop per §3; old rows are not
//! retained indefinitely.

use netrecon_models::system_status::{LocalDevice, SystemStatus};
use sqlx::SqlitePool;

pub async fn create(
    pool: &SqlitePool,
    status: &SystemStatus,
    local_device: Option<&LocalDevice>,
) -> Result<SystemStatus, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        "INSERT INTO system_status (network_id, public_ip, created_at, updated_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&status.network_id)
    .bind(&status.public_ip)
    .bind(&status.created_at)
    .bind(&status.updated_at)
    .execute(&mut *tx)
    .await?;
    let id = result.last_insert_rowid();

    if let Some(ld) = local_device {
        sqlx::query(
            "INSERT INTO local_devices (system_status_id, name, ipv4, mac, vendor, status, hostname)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&ld.name)
        .bind(&ld.ipv4)
        .bind(&ld.mac)
        .bind(&ld.vendor)
        .bind(&ld.status)
        .bind(&ld.hostname)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(SystemStatus {
        id,
        ..status.clone()
    })
}

pub async fn latest(pool: &SqlitePool) -> Result<Option<SystemStatus>, sqlx::Error> {
    sqlx::query_as::<_, SystemStatus>("SELECT * FROM system_status ORDER BY created_at DESC LIMIT 1")
        .fetch_optional(pool)
        .await
}

pub async fn latest_local_device(pool: &SqlitePool, system_status_id: i64) -> Result<Option<LocalDevice>, sqlx::Error> {
    sqlx::query_as::<_, LocalDevice>("SELECT * FROM local_devices WHERE system_status_id = ?")
        .bind(system_status_id)
        .fetch_optional(pool)
        .await
}

/// Delete all but the most recent row, keeping the table from growing
/// unbounded across the engine's lifetime.
pub async fn prune_all_but_latest(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "DELETE FROM system_status WHERE id NOT IN (
            SELECT id FROM system_status ORDER BY created_at DESC LIMIT 1
         )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

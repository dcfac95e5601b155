//! Device repository.

use netrecon_models::device::Device;
use sqlx::SqlitePool;

pub async fn insert(pool: &SqlitePool, device: &Device) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO devices (id, name, comment, ipv4, mac, hostname, vendor, device_type,
            os_name, os_version, os_family, os_confidence, status, network_id,
            created_at, updated_at, last_seen_online_at, port_scan_started_at,
            port_scan_ended_at, web_scan_ended_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&device.id)
    .bind(&device.name)
    .bind(&device.comment)
    .bind(&device.ipv4)
    .bind(&device.mac)
    .bind(&device.hostname)
    .bind(&device.vendor)
    .bind(&device.device_type)
    .bind(&device.os_name)
    .bind(&device.os_version)
    .bind(&device.os_family)
    .bind(device.os_confidence)
    .bind(&device.status)
    .bind(&device.network_id)
    .bind(&device.created_at)
    .bind(&device.updated_at)
    .bind(&device.last_seen_online_at)
    .bind(&device.port_scan_started_at)
    .bind(&device.port_scan_ended_at)
    .bind(&device.web_scan_ended_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn get_by_ip(pool: &SqlitePool, ipv4: &str) -> Result<Option<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE ipv4 = ?")
        .bind(ipv4)
        .fetch_optional(pool)
        .await
}

pub async fn get_by_mac(pool: &SqlitePool, mac: &str) -> Result<Option<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE mac = ?")
        .bind(mac)
        .fetch_optional(pool)
        .await
}

pub async fn list_by_network(pool: &SqlitePool, network_id: &str) -> Result<Vec<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE network_id = ? ORDER BY updated_at DESC")
        .bind(network_id)
        .fetch_all(pool)
        .await
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Device>, sqlx::Error> {
    sqlx::query_as::<_, Device>("SELECT * FROM devices ORDER BY updated_at DESC")
        .fetch_all(pool)
        .await
}

/// Upsert keyed by `ipv4`. The caller is responsible for having already
/// merged preserved fields (id, created_at, device_type, os_*, name,
/// comment) per the Device Reconciler's rules — this function is a plain
/// insert-or-update-by-ipv4 write, not itself the reconciliation logic.
pub async fn upsert(pool: &SqlitePool, device: &Device) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO devices (id, name, comment, ipv4, mac, hostname, vendor, device_type,
            os_name, os_version, os_family, os_confidence, status, network_id,
            created_at, updated_at, last_seen_online_at, port_scan_started_at,
            port_scan_ended_at, web_scan_ended_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(ipv4) DO UPDATE SET
            id = excluded.id,
            name = excluded.name,
            comment = excluded.comment,
            mac = excluded.mac,
            hostname = excluded.hostname,
            vendor = excluded.vendor,
            device_type = excluded.device_type,
            os_name = excluded.os_name,
            os_version = excluded.os_version,
            os_family = excluded.os_family,
            os_confidence = excluded.os_confidence,
            status = excluded.status,
            network_id = excluded.network_id,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at,
            last_seen_online_at = excluded.last_seen_online_at,
            port_scan_started_at = excluded.port_scan_started_at,
            port_scan_ended_at = excluded.port_scan_ended_at,
            web_scan_ended_at = excluded.web_scan_ended_at",
    )
    .bind(&device.id)
    .bind(&device.name)
    .bind(&device.comment)
    .bind(&device.ipv4)
    .bind(&device.mac)
    .bind(&device.hostname)
    .bind(&device.vendor)
    .bind(&device.device_type)
    .bind(&device.os_name)
    .bind(&device.os_version)
    .bind(&device.os_family)
    .bind(device.os_confidence)
    .bind(&device.status)
    .bind(&device.network_id)
    .bind(&device.created_at)
    .bind(&device.updated_at)
    .bind(&device.last_seen_online_at)
    .bind(&device.port_scan_started_at)
    .bind(&device.port_scan_ended_at)
    .bind(&device.web_scan_ended_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Moves an existing row to a new `ipv4` by primary key, without touching
/// any other column. Used ahead of `upsert` when reconciliation follows a
/// device's MAC to a new address: without this the `ON CONFLICT(ipv4)`
/// upsert sees no conflict at the new IP and attempts a plain insert that
/// collides on the still-present `id` at the old IP.
pub async fn relocate_ip(pool: &SqlitePool, id: &str, new_ipv4: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE devices SET ipv4 = ? WHERE id = ?")
        .bind(new_ipv4)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_port_scan_started(pool: &SqlitePool, id: &str, started_at: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE devices SET port_scan_started_at = ? WHERE id = ?")
        .bind(started_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_port_scan_ended(pool: &SqlitePool, id: &str, ended_at: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE devices SET port_scan_ended_at = ? WHERE id = ?")
        .bind(ended_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn set_web_scan_ended(pool: &SqlitePool, id: &str, ended_at: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE devices SET web_scan_ended_at = ? WHERE id = ?")
        .bind(ended_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bulk status transition, implemented in SQL for atomicity per §9's
/// preference: devices past the offline cutoff become offline; devices
/// still online past the idle cutoff become idle.
pub async fn update_device_statuses(
    pool: &SqlitePool,
    now: &str,
    idle_cutoff: &str,
    offline_cutoff: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE devices SET status = 'offline', updated_at = ?
         WHERE status IN ('online', 'idle') AND last_seen_online_at < ?",
    )
    .bind(now)
    .bind(offline_cutoff)
    .execute(pool)
    .await?;

    sqlx::query(
        "UPDATE devices SET status = 'idle', updated_at = ?
         WHERE status = 'online' AND last_seen_online_at < ?",
    )
    .bind(now)
    .bind(idle_cutoff)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM devices WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_by_network(pool: &SqlitePool, network_id: &str) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM devices WHERE network_id = ?")
        .bind(network_id)
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

//! Geolocation cache repository, keyed by IP literal.

use netrecon_models::geolocation::GeolocationCache;
use sqlx::SqlitePool;

pub async fn find_by_ip(pool: &SqlitePool, ip: &str) -> Result<Option<GeolocationCache>, sqlx::Error> {
    sqlx::query_as::<_, GeolocationCache>("SELECT * FROM geolocation_cache WHERE ip = ?")
        .bind(ip)
        .fetch_optional(pool)
        .await
}

/// Create or replace the cached record for an IP.
pub async fn upsert(pool: &SqlitePool, entry: &GeolocationCache) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO geolocation_cache (id, ip, city, region, country, country_code,
            latitude, longitude, timezone, isp, source, created_at, updated_at, expires_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(ip) DO UPDATE SET
            city = excluded.city,
            region = excluded.region,
            country = excluded.country,
            country_code = excluded.country_code,
            latitude = excluded.latitude,
            longitude = excluded.longitude,
            timezone = excluded.timezone,
            isp = excluded.isp,
            source = excluded.source,
            updated_at = excluded.updated_at,
            expires_at = excluded.expires_at",
    )
    .bind(&entry.id)
    .bind(&entry.ip)
    .bind(&entry.city)
    .bind(&entry.region)
    .bind(&entry.country)
    .bind(&entry.country_code)
    .bind(entry.latitude)
    .bind(entry.longitude)
    .bind(&entry.timezone)
    .bind(&entry.isp)
    .bind(&entry.source)
    .bind(&entry.created_at)
    .bind(&entry.updated_at)
    .bind(&entry.expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_expired(pool: &SqlitePool, now: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM geolocation_cache WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

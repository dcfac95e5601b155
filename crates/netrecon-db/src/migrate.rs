//! Schema migration from SQL files.

use sqlx::SqlitePool;

/// SQL statements for all 7 tables, in order. Additive and idempotent: every
/// statement uses `CREATE ... IF NOT EXISTS`, so re-running this is safe.
const MIGRATIONS: &[(&str, &str)] = &[
    ("001_create_networks", include_str!("../../../migrations/sql/001_create_networks.sql")),
    ("002_create_devices", include_str!("../../../migrations/sql/002_create_devices.sql")),
    ("003_create_ports", include_str!("../../../migrations/sql/003_create_ports.sql")),
    ("004_create_web_services", include_str!("../../../migrations/sql/004_create_web_services.sql")),
    ("005_create_event_logs", include_str!("../../../migrations/sql/005_create_event_logs.sql")),
    ("006_create_system_status", include_str!("../../../migrations/sql/006_create_system_status.sql")),
    ("007_create_geolocation_cache", include_str!("../../../migrations/sql/007_create_geolocation_cache.sql")),
];

/// Run all migrations against the database.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for (name, sql) in MIGRATIONS {
        tracing::debug!("running migration: {name}");
        sqlx::raw_sql(sql).execute(pool).await?;
    }
    tracing::info!("all {} migrations applied", MIGRATIONS.len());
    Ok(())
}

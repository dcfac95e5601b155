//! The composition root: wires config, store, writer queue, event sink,
//! OUI table, and the Scan Manager into one handle an external binary (out
//! of this crate's scope per §1) can drive.

use std::path::Path;
use std::sync::Arc;

use netrecon_db::repo::networks;
use netrecon_db::WriterQueue;
use netrecon_events::{SharedEventSink, StoreEventSink};
use netrecon_models::error::CoreError;
use netrecon_models::event::EventType;
use netrecon_models::network::Network;
use netrecon_platform::local_network;
use netrecon_platform::oui_refresh;
use netrecon_scan::{ScanManager, ScanManagerConfig};
use netrecon_scanner::oui::OuiTable;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::config::{load_config, ConfigError, NetreconConfig};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Installs the process-wide `tracing` subscriber once. Safe to call more
/// than once (e.g. from repeated test setup) — later calls are ignored.
fn install_tracing(logging: &crate::config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_new(&logging.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if logging.format == "json" {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    };
}

/// Central orchestration handle for the recon engine.
pub struct NetreconEngine {
    config: NetreconConfig,
    pool: SqlitePool,
    writer: WriterQueue,
    sink: SharedEventSink,
    oui_table: OuiTable,
    scan_manager: ScanManager,
}

impl NetreconEngine {
    /// Load config, open the store, run migrations, and wire every
    /// subsystem together.
    pub async fn new(config_dir: Option<&Path>) -> EngineResult<Self> {
        let config = load_config(config_dir)?;
        let pool = netrecon_db::create_pool(&format!("sqlite:{}", config.database.database_path)).await?;
        Self::from_config_and_pool(config, pool).await
    }

    /// Wire the engine around a pre-existing pool (in-memory SQLite in tests).
    pub async fn new_with_pool(config_dir: Option<&Path>, pool: SqlitePool) -> EngineResult<Self> {
        let config = load_config(config_dir)?;
        Self::from_config_and_pool(config, pool).await
    }

    async fn from_config_and_pool(config: NetreconConfig, pool: SqlitePool) -> EngineResult<Self> {
        install_tracing(&config.logging);
        netrecon_db::run_migrations(&pool).await?;

        let writer = WriterQueue::spawn(pool.clone());
        let sink: SharedEventSink = Arc::new(StoreEventSink::new(writer.clone()));
        let oui_table = OuiTable::new();

        let scan_config = ScanManagerConfig {
            discovery_interval: config.scan.discovery_interval(),
            discovery_concurrency: config.scan.discovery_concurrency as usize,
            offline_timeout: config.scan.offline_timeout(),
            port_scan_cooldown: config.scan.port_scan_cooldown(),
            screenshots_enabled: config.scan.screenshots_enabled,
            ..ScanManagerConfig::default()
        };
        let scan_manager = ScanManager::new(pool.clone(), writer.clone(), sink.clone(), oui_table.clone(), scan_config);

        Ok(Self {
            config,
            pool,
            writer,
            sink,
            oui_table,
            scan_manager,
        })
    }

    /// Refresh the on-disk OUI database if stale, then load it into memory
    /// (§10.6's `oui_refresh_days` wiring); detect and log the local
    /// network if the seeded `network_range` has no matching row yet.
    pub async fn bootstrap(&self, oui_db_path: &Path) -> EngineResult<()> {
        if oui_refresh::needs_refresh(oui_db_path, self.config.scan.oui_refresh_age()) {
            const OUI_DB_URL: &str = "https://standards-oui.ieee.org/oui/oui.txt";
            if let Err(e) = oui_refresh::refresh_oui_database(oui_db_path, OUI_DB_URL).await {
                tracing::warn!(error = %e, "oui database refresh failed, continuing with existing copy");
            }
        }
        if let Ok(text) = tokio::fs::read_to_string(oui_db_path).await {
            self.oui_table.load(&text);
        }

        self.detect_local_network().await?;
        Ok(())
    }

    /// §10.6: detect the host's local IPv4/subnet and log `LocalIPFound` /
    /// `LocalNetworkFound` the first time each is observed; if the subnet
    /// has no matching `Network` row, log `NewNetworkDetected` without
    /// creating one (network creation stays user-initiated).
    async fn detect_local_network(&self) -> EngineResult<()> {
        let Some(ip) = local_network::local_ipv4() else {
            return Ok(());
        };
        self.sink.emit(EventType::LocalIpFound, format!("local address {ip}"), None).await?;

        let Some(subnet) = local_network::assume_local_network(ip) else {
            return Ok(());
        };
        self.sink
            .emit(EventType::LocalNetworkFound, format!("local network {subnet}"), None)
            .await?;

        match networks::find_by_cidr(&self.pool, &subnet.to_string()).await {
            Ok(_) => {}
            Err(CoreError::NotFound(_)) => {
                self.sink
                    .emit(EventType::NewNetworkDetected, format!("undeclared network {subnet}"), None)
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn writer(&self) -> &WriterQueue {
        &self.writer
    }

    pub fn config(&self) -> &NetreconConfig {
        &self.config
    }

    pub fn scan_manager(&self) -> &ScanManager {
        &self.scan_manager
    }

    pub fn oui_table(&self) -> &OuiTable {
        &self.oui_table
    }

    /// Create a Network row and seed it from `config.network.network_range`
    /// if no network exists yet, then select it for scanning. A no-op if
    /// any network already exists — this never overwrites user data.
    pub async fn ensure_seed_network(&self) -> EngineResult<Network> {
        let existing = networks::find_all(&self.pool).await?;
        if let Some(network) = existing.into_iter().next() {
            return Ok(network);
        }

        let network = Network::new("default".into(), self.config.network.network_range.clone())
            .map_err(EngineError::Core)?;
        networks::create_or_update(&self.pool, &network).await?;
        self.sink
            .emit(EventType::NetworkCreated, format!("seeded network {}", network.cidr), None)
            .await?;
        Ok(network)
    }

    pub async fn shutdown(&self) -> EngineResult<()> {
        self.scan_manager.stop_scan().await?;
        self.writer.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config_dir() -> PathBuf {
        let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        dir.pop();
        dir.pop();
        dir.join("config")
    }

    async fn test_engine() -> NetreconEngine {
        let pool = netrecon_db::create_test_pool().await.unwrap();
        NetreconEngine::new_with_pool(Some(&config_dir()), pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_engine_new_with_pool_loads_config() {
        let engine = test_engine().await;
        assert_eq!(engine.config().network.network_range, "192.168.1.0/24");
    }

    #[tokio::test]
    async fn test_ensure_seed_network_creates_once() {
        let engine = test_engine().await;
        let first = engine.ensure_seed_network().await.unwrap();
        let second = engine.ensure_seed_network().await.unwrap();
        assert_eq!(first.id, second.id);

        let all = networks::find_all(engine.pool()).await.unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn test_engine_scan_manager_starts_and_stops() {
        let engine = test_engine().await;
        let network = engine.ensure_seed_network().await.unwrap();

        engine.scan_manager().start_scan(&network.id).await.unwrap();
        assert!(engine.scan_manager().state().await.running);

        engine.shutdown().await.unwrap();
        assert!(!engine.scan_manager().state().await.running);
    }

    #[tokio::test]
    async fn test_engine_invalid_config_dir() {
        let result = NetreconEngine::new(Some(Path::new("/nonexistent/config/dir"))).await;
        assert!(result.is_err());
    }
}

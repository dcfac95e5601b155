//! Layered TOML configuration loading via the `config` crate (§6, §10.4).
//!
//! Load order: `default.toml` (required) -> `local.toml` (optional) ->
//! `NETRECON_` env vars with a `__` separator for nested keys.

use std::path::Path;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration for the recon engine.
#[derive(Debug, Clone, Deserialize)]
pub struct NetreconConfig {
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scan: ScanConfig,
    pub auth: AuthConfig,
}

/// Which LAN this instance scans by default.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub network_range: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Credentials the external tools (port scanner, OS detector) log in with,
/// where the target requires it. Opaque to the core beyond passing through.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub login_username: String,
    pub login_password: String,
}

fn default_discovery_concurrency() -> u32 {
    50
}

fn default_offline_timeout_secs() -> u64 {
    180
}

fn default_oui_refresh_days() -> u64 {
    30
}

/// Scan-pipeline tunables (§6's enumerated keys minus network/auth/db).
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_discovery_concurrency")]
    pub discovery_concurrency: u32,
    pub discovery_interval_secs: u64,
    pub port_scan_cooldown_secs: u64,
    #[serde(default = "default_offline_timeout_secs")]
    pub offline_timeout_secs: u64,
    pub screenshots_enabled: bool,
    #[serde(default = "default_oui_refresh_days")]
    pub oui_refresh_days: u64,
}

impl ScanConfig {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_secs(self.discovery_interval_secs)
    }

    pub fn port_scan_cooldown(&self) -> Duration {
        Duration::from_secs(self.port_scan_cooldown_secs)
    }

    pub fn offline_timeout(&self) -> Duration {
        Duration::from_secs(self.offline_timeout_secs)
    }

    pub fn oui_refresh_age(&self) -> Duration {
        Duration::from_secs(self.oui_refresh_days * 24 * 60 * 60)
    }
}

impl NetreconConfig {
    /// Check the invariants §10.4 calls out: the seed CIDR parses, and every
    /// threshold is positive. `cooldown <= offline_timeout` is explicitly
    /// not required.
    fn validate(&self) -> ConfigResult<()> {
        self.network
            .network_range
            .parse::<Ipv4Network>()
            .map_err(|e| ConfigError::Validation(format!("network_range '{}': {e}", self.network.network_range)))?;

        if self.scan.discovery_concurrency == 0 {
            return Err(ConfigError::Validation("discovery_concurrency must be positive".into()));
        }
        if self.scan.discovery_interval_secs == 0 {
            return Err(ConfigError::Validation("discovery_interval_secs must be positive".into()));
        }
        if self.scan.port_scan_cooldown_secs == 0 {
            return Err(ConfigError::Validation("port_scan_cooldown_secs must be positive".into()));
        }
        if self.scan.offline_timeout_secs == 0 {
            return Err(ConfigError::Validation("offline_timeout_secs must be positive".into()));
        }
        if self.scan.oui_refresh_days == 0 {
            return Err(ConfigError::Validation("oui_refresh_days must be positive".into()));
        }
        Ok(())
    }
}

/// Load configuration from TOML files and environment variables.
///
/// Load order:
/// 1. `{config_dir}/default.toml` (required)
/// 2. `{config_dir}/local.toml` (optional)
/// 3. Environment variables with prefix `NETRECON` and separator `__`
///
/// If `config_dir` is `None`, defaults to `"config"` relative to the current directory.
pub fn load_config(config_dir: Option<&Path>) -> ConfigResult<NetreconConfig> {
    let dir = config_dir
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| std::path::PathBuf::from("config"));

    let default_path = dir.join("default.toml");
    let local_path = dir.join("local.toml");

    let builder = config::Config::builder()
        .add_source(config::File::from(default_path).required(true))
        .add_source(config::File::from(local_path).required(false))
        .add_source(
            config::Environment::with_prefix("NETRECON")
                .separator("__")
                .try_parsing(true),
        );

    let built = builder.build()?;
    let cfg: NetreconConfig = built.try_deserialize()?;
    cfg.validate()?;
    Ok(cfg)
}

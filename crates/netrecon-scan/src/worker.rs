//! Per-device enrichment: Port Scanner (C7) -> Web Prober (C8) ->
//! Fingerprinter (C9), run sequentially so each stage sees the previous
//! stage's writes (§5's causal-ordering guarantee for one device's
//! lifecycle).

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use netrecon_db::repo::{devices, ports, web_services};
use netrecon_db::WriterQueue;
use netrecon_events::EventSink;
use netrecon_models::device::Device;
use netrecon_models::error::{CoreError, Result};
use netrecon_models::event::EventType;
use netrecon_scanner::fingerprint::{self, ClassificationInput};
use netrecon_scanner::port_scan::{self, PortScanError};
use netrecon_scanner::web_probe::{self, NoScreenshotter};
use sqlx::SqlitePool;

/// Tunables threaded down from `ScanManagerConfig`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub port_scan_cooldown: Duration,
    pub screenshots_enabled: bool,
}

/// True if `device` is due for a port scan: never scanned, or its last scan
/// ended further back than `cooldown` (§4.7).
pub fn port_scan_eligible(device: &Device, cooldown: Duration, now: chrono::DateTime<Utc>) -> bool {
    let Some(ended_at) = &device.port_scan_ended_at else {
        return true;
    };
    let Ok(ended_at) = chrono::DateTime::parse_from_rfc3339(ended_at) else {
        return true;
    };
    let elapsed = now.signed_duration_since(ended_at.with_timezone(&Utc));
    elapsed.to_std().unwrap_or(Duration::MAX) >= cooldown
}

/// Run the enrichment stages for one already-reconciled device, returning
/// its final in-memory state. Every persistence step goes through the
/// Writer Queue; stage failures are logged and non-fatal (§7 "External
/// tool failure").
pub async fn enrich_device(
    pool: &SqlitePool,
    writer: &WriterQueue,
    sink: &dyn EventSink,
    scanner_binary: Option<&PathBuf>,
    mut device: Device,
    config: &WorkerConfig,
) -> Result<Device> {
    let mut ports_changed = false;

    if let Some(binary) = scanner_binary {
        if port_scan_eligible(&device, config.port_scan_cooldown, Utc::now()) {
            device = run_port_scan(pool, writer, sink, binary, device).await?;
            ports_changed = true;
        }
    }

    if ports_changed {
        let web_ports = ports::list_by_device(pool, &device.id)
            .await
            .map_err(|e| CoreError::Other(e.to_string()))?;
        if web_ports.iter().any(|p| p.looks_like_web()) {
            device = run_web_probe(pool, writer, &device, &web_ports, config.screenshots_enabled).await?;
        }
    }

    device = run_fingerprint(pool, writer, scanner_binary, device, ports_changed).await?;

    Ok(device)
}

async fn run_port_scan(
    pool: &SqlitePool,
    writer: &WriterQueue,
    sink: &dyn EventSink,
    binary: &PathBuf,
    mut device: Device,
) -> Result<Device> {
    let now = Utc::now().to_rfc3339();
    device.port_scan_started_at = Some(now.clone());
    let device_id = device.id.clone();
    writer
        .exec_r(move |pool| {
            let device_id = device_id.clone();
            let now = now.clone();
            async move {
                devices::set_port_scan_started(&pool, &device_id, &now)
                    .await
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await?;
    sink.emit(
        EventType::PortScanStarted,
        format!("port scan started for {}", device.ipv4),
        Some(device.id.clone()),
    )
    .await?;

    let ip: std::net::Ipv4Addr = device
        .ipv4
        .parse()
        .map_err(|_| CoreError::Validation(format!("invalid device ipv4 '{}'", device.ipv4)))?;

    match port_scan::scan_ports(binary, ip).await {
        Ok(mut found_ports) => {
            for p in &mut found_ports {
                p.device_id = device.id.clone();
            }
            ports::replace_for_device(pool, &device.id, &found_ports)
                .await
                .map_err(|e| CoreError::Other(e.to_string()))?;

            let ended_at = Utc::now().to_rfc3339();
            device.port_scan_ended_at = Some(ended_at.clone());
            let device_id = device.id.clone();
            writer
                .exec_r(move |pool| {
                    let device_id = device_id.clone();
                    let ended_at = ended_at.clone();
                    async move {
                        devices::set_port_scan_ended(&pool, &device_id, &ended_at)
                            .await
                            .map_err(|e| CoreError::Other(e.to_string()))
                    }
                })
                .await?;
            sink.emit(
                EventType::PortScanCompleted,
                format!("port scan completed for {} ({} ports)", device.ipv4, found_ports.len()),
                Some(device.id.clone()),
            )
            .await?;
        }
        Err(e) => {
            // §4.7 step 5: leave port_scan_started_at set (cooldown still
            // applies), do not touch the existing port list.
            tracing::warn!(device = %device.ipv4, error = %e, "port scan failed");
            if matches!(e, PortScanError::BinaryNotFound) {
                tracing::warn!("port scanner binary unavailable, skipping remaining scans this pass");
            }
        }
    }

    Ok(device)
}

async fn run_web_probe(
    pool: &SqlitePool,
    writer: &WriterQueue,
    device: &Device,
    ports: &[netrecon_models::port::Port],
    screenshots_enabled: bool,
) -> Result<Device> {
    let mut device = device.clone();
    let screenshotter = NoScreenshotter;
    let services = web_probe::probe_device(&device.id, &device.ipv4, ports, screenshots_enabled, &screenshotter).await;

    web_services::replace_for_device(pool, &device.id, &services)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;

    let ended_at = Utc::now().to_rfc3339();
    device.web_scan_ended_at = Some(ended_at.clone());
    let device_id = device.id.clone();
    writer
        .exec_r(move |pool| {
            let device_id = device_id.clone();
            let ended_at = ended_at.clone();
            async move {
                devices::set_web_scan_ended(&pool, &device_id, &ended_at)
                    .await
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await?;

    Ok(device)
}

async fn run_fingerprint(
    pool: &SqlitePool,
    writer: &WriterQueue,
    scanner_binary: Option<&PathBuf>,
    mut device: Device,
    run_os_probe: bool,
) -> Result<Device> {
    let ports = ports::list_by_device(pool, &device.id)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    let web_services = web_services::list_by_device(pool, &device.id)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;

    let input = ClassificationInput {
        vendor: device.vendor.as_deref(),
        hostname: device.hostname.as_deref(),
        ports: &ports,
        web_services: &web_services,
    };
    device.device_type = fingerprint::classify_device(&input).as_str().to_string();

    if run_os_probe {
        if let Some(binary) = scanner_binary {
            if let Ok(ip) = device.ipv4.parse::<std::net::Ipv4Addr>() {
                match port_scan::detect_os(binary, ip).await {
                    Ok(Some(os_match)) => {
                        device.os_name = Some(os_match.name);
                        device.os_family = os_match.family;
                        device.os_confidence = Some(fingerprint::accuracy_to_confidence(os_match.accuracy));
                    }
                    Ok(None) => {}
                    Err(e) => tracing::warn!(device = %device.ipv4, error = %e, "os detection failed"),
                }
            }
        }
    }

    let submitted = writer
        .exec_r(move |pool| {
            let device = device.clone();
            async move {
                devices::upsert(&pool, &device)
                    .await
                    .map(|_| device)
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await?;

    Ok(submitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_db::repo::networks;
    use netrecon_db::{create_test_pool, run_migrations};
    use netrecon_events::NullEventSink;
    use netrecon_models::network::Network;

    #[test]
    fn test_port_scan_eligible_when_never_scanned() {
        let mut device = Device::new("10.0.0.5".into(), "net-1".into());
        device.port_scan_ended_at = None;
        assert!(port_scan_eligible(&device, Duration::from_secs(30), Utc::now()));
    }

    #[test]
    fn test_port_scan_eligible_respects_cooldown() {
        let mut device = Device::new("10.0.0.5".into(), "net-1".into());
        device.port_scan_ended_at = Some(Utc::now().to_rfc3339());
        assert!(!port_scan_eligible(&device, Duration::from_secs(30), Utc::now()));
    }

    #[test]
    fn test_port_scan_eligible_once_cooldown_elapsed() {
        let mut device = Device::new("10.0.0.5".into(), "net-1".into());
        let ended = Utc::now() - chrono::Duration::seconds(60);
        device.port_scan_ended_at = Some(ended.to_rfc3339());
        assert!(port_scan_eligible(&device, Duration::from_secs(30), Utc::now()));
    }

    #[test]
    fn test_port_scan_eligible_on_unparseable_timestamp() {
        let mut device = Device::new("10.0.0.5".into(), "net-1".into());
        device.port_scan_ended_at = Some("not-a-date".into());
        assert!(port_scan_eligible(&device, Duration::from_secs(30), Utc::now()));
    }

    async fn setup() -> (SqlitePool, WriterQueue, Device) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let network = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
        networks::create_or_update(&pool, &network).await.unwrap();
        let writer = WriterQueue::spawn(pool.clone());
        let device = Device::new("10.0.0.5".into(), network.id.clone());
        devices::upsert(&pool, &device).await.unwrap();
        (pool, writer, device)
    }

    #[tokio::test]
    async fn test_enrich_device_without_scanner_binary_only_fingerprints() {
        let (pool, writer, device) = setup().await;
        let sink = NullEventSink;
        let config = WorkerConfig {
            port_scan_cooldown: Duration::from_secs(30),
            screenshots_enabled: false,
        };

        let enriched = enrich_device(&pool, &writer, &sink, None, device.clone(), &config)
            .await
            .unwrap();

        assert_eq!(enriched.id, device.id);
        assert!(enriched.port_scan_started_at.is_none());
        assert!(!enriched.device_type.is_empty());
    }
}

//! Integration tests for the storage layer against in-memory SQLite,
//! exercising the reconciliation and status-decay scenarios end to end.

use netrecon_db::repo::{devices, event_logs, geolocation, networks, ports, system_status, web_services};
use netrecon_db::{create_pool, run_migrations};
use netrecon_models::device::{Device, DeviceStatus};
use netrecon_models::event::{EventLog, EventType};
use netrecon_models::geolocation::{GeoSource, GeolocationCache};
use netrecon_models::network::Network;
use netrecon_models::port::{Port, PortProtocol, PortState};
use netrecon_models::system_status::{LocalDevice, SystemStatus};
use netrecon_models::web_service::{WebProtocol, WebService};

async fn setup() -> sqlx::SqlitePool {
    let pool = create_pool("sqlite::memory:").await.expect("pool creation failed");
    run_migrations(&pool).await.expect("migrations failed");
    pool
}

#[tokio::test]
async fn test_migrations_idempotent() {
    let pool = setup().await;
    run_migrations(&pool).await.expect("second migration run failed");
}

#[tokio::test]
async fn test_network_crud_and_delete_conflict() {
    let pool = setup().await;

    let net = Network::new("lan".into(), "192.168.1.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();

    let fetched = networks::find_by_id(&pool, &net.id).await.unwrap();
    assert_eq!(fetched.cidr, "192.168.1.0/24");

    let by_cidr = networks::find_by_cidr(&pool, "192.168.1.0/24").await.unwrap();
    assert_eq!(by_cidr.id, net.id);

    let device = Device::new("192.168.1.5".into(), net.id.clone());
    devices::insert(&pool, &device).await.unwrap();

    // A network with a device attached refuses deletion (§4.1).
    let err = networks::delete(&pool, &net.id).await.unwrap_err();
    assert!(matches!(err, netrecon_models::error::CoreError::Conflict(_)));

    devices::delete(&pool, &device.id).await.unwrap();
    networks::delete(&pool, &net.id).await.unwrap();
    assert!(networks::find_by_id(&pool, &net.id).await.is_err());
}

#[tokio::test]
async fn test_device_first_sighting_and_upsert_by_ip() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();

    let mut device = Device::new("10.0.0.1".into(), net.id.clone());
    device.hostname = Some("router.local".into());
    device.mac = Some("AA:BB:CC:DD:EE:FF".into());
    devices::insert(&pool, &device).await.unwrap();

    let fetched = devices::get_by_id(&pool, &device.id).await.unwrap().unwrap();
    assert_eq!(fetched.ipv4, "10.0.0.1");
    assert_eq!(fetched.hostname.as_deref(), Some("router.local"));

    // Re-sighting the same IP updates in place via upsert.
    let mut reseen = fetched.clone();
    reseen.hostname = Some("gateway.local".into());
    devices::upsert(&pool, &reseen).await.unwrap();

    let updated = devices::get_by_ip(&pool, "10.0.0.1").await.unwrap().unwrap();
    assert_eq!(updated.id, device.id);
    assert_eq!(updated.hostname.as_deref(), Some("gateway.local"));

    let all = devices::list_by_network(&pool, &net.id).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_device_dhcp_swap_reconciled_by_mac() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();

    let mut device = Device::new("10.0.0.1".into(), net.id.clone());
    device.mac = Some("AA:BB:CC:DD:EE:FF".into());
    devices::insert(&pool, &device).await.unwrap();

    // Same MAC reappears on a new IP — the reconciler looks it up by MAC
    // first, then writes the same id under the new address.
    let by_mac = devices::get_by_mac(&pool, "AA:BB:CC:DD:EE:FF").await.unwrap().unwrap();
    assert_eq!(by_mac.id, device.id);

    let mut moved = by_mac;
    moved.ipv4 = "10.0.0.99".into();
    devices::upsert(&pool, &moved).await.unwrap();

    assert!(devices::get_by_ip(&pool, "10.0.0.1").await.unwrap().is_none());
    let relocated = devices::get_by_ip(&pool, "10.0.0.99").await.unwrap().unwrap();
    assert_eq!(relocated.id, device.id);
}

#[tokio::test]
async fn test_device_status_decay() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();

    let now = chrono::Utc::now();
    let mut device = Device::new("10.0.0.1".into(), net.id.clone());
    device.last_seen_online_at = Some((now - chrono::Duration::minutes(10)).to_rfc3339());
    devices::insert(&pool, &device).await.unwrap();

    let idle_cutoff = (now - chrono::Duration::minutes(3)).to_rfc3339();
    let offline_cutoff = (now - chrono::Duration::minutes(5)).to_rfc3339();
    devices::update_device_statuses(&pool, &now.to_rfc3339(), &idle_cutoff, &offline_cutoff)
        .await
        .unwrap();

    let after = devices::get_by_id(&pool, &device.id).await.unwrap().unwrap();
    assert_eq!(after.status_enum(), DeviceStatus::Offline);
}

#[tokio::test]
async fn test_device_status_idle_without_crossing_offline() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();

    let now = chrono::Utc::now();
    let mut device = Device::new("10.0.0.2".into(), net.id.clone());
    device.last_seen_online_at = Some((now - chrono::Duration::minutes(4)).to_rfc3339());
    devices::insert(&pool, &device).await.unwrap();

    let idle_cutoff = (now - chrono::Duration::minutes(3)).to_rfc3339();
    let offline_cutoff = (now - chrono::Duration::minutes(5)).to_rfc3339();
    devices::update_device_statuses(&pool, &now.to_rfc3339(), &idle_cutoff, &offline_cutoff)
        .await
        .unwrap();

    let after = devices::get_by_id(&pool, &device.id).await.unwrap().unwrap();
    assert_eq!(after.status_enum(), DeviceStatus::Idle);
}

#[tokio::test]
async fn test_port_replace_for_device() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();
    let device = Device::new("10.0.0.1".into(), net.id.clone());
    devices::insert(&pool, &device).await.unwrap();

    let first = vec![Port::new(device.id.clone(), 22, PortProtocol::Tcp, PortState::Open)];
    ports::replace_for_device(&pool, &device.id, &first).await.unwrap();
    assert_eq!(ports::list_by_device(&pool, &device.id).await.unwrap().len(), 1);

    let second = vec![
        Port::new(device.id.clone(), 80, PortProtocol::Tcp, PortState::Open),
        Port::new(device.id.clone(), 443, PortProtocol::Tcp, PortState::Open),
    ];
    ports::replace_for_device(&pool, &device.id, &second).await.unwrap();
    let after = ports::list_by_device(&pool, &device.id).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].number, "80");
    assert_eq!(after[1].number, "443");
}

#[tokio::test]
async fn test_web_services_replace_for_device() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();
    let device = Device::new("10.0.0.1".into(), net.id.clone());
    devices::insert(&pool, &device).await.unwrap();

    let ws = vec![WebService::new(
        device.id.clone(),
        "http://10.0.0.1/".into(),
        "80".into(),
        WebProtocol::Http,
    )];
    web_services::replace_for_device(&pool, &device.id, &ws).await.unwrap();
    let listed = web_services::list_by_device(&pool, &device.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].protocol, "http");
}

#[tokio::test]
async fn test_cascade_delete_device() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();
    let device = Device::new("10.0.0.10".into(), net.id.clone());
    devices::insert(&pool, &device).await.unwrap();

    let port = Port::new(device.id.clone(), 80, PortProtocol::Tcp, PortState::Open);
    ports::upsert(&pool, &port).await.unwrap();
    let ws = WebService::new(device.id.clone(), "http://10.0.0.10/".into(), "80".into(), WebProtocol::Http);
    web_services::replace_for_device(&pool, &device.id, std::slice::from_ref(&ws)).await.unwrap();

    devices::delete(&pool, &device.id).await.unwrap();

    assert!(ports::list_by_device(&pool, &device.id).await.unwrap().is_empty());
    assert!(web_services::list_by_device(&pool, &device.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_event_log_append_only_and_filters() {
    let pool = setup().await;
    let net = Network::new("lan".into(), "10.0.0.0/24".into()).unwrap();
    networks::create_or_update(&pool, &net).await.unwrap();
    let device = Device::new("10.0.0.1".into(), net.id.clone());
    devices::insert(&pool, &device).await.unwrap();

    let e1 = EventLog::new(EventType::DeviceOnline, "10.0.0.1 is online".into(), Some(device.id.clone()));
    let created = event_logs::create(&pool, &e1).await.unwrap();
    assert!(created.id > 0);

    let e2 = EventLog::new(EventType::PingSweep, "sweep complete".into(), None);
    event_logs::create(&pool, &e2).await.unwrap();

    let by_device = event_logs::list_by_device(&pool, &device.id).await.unwrap();
    assert_eq!(by_device.len(), 1);

    let by_type = event_logs::list_by_type(&pool, "PingSweep").await.unwrap();
    assert_eq!(by_type.len(), 1);

    let recent = event_logs::list_recent(&pool, 10).await.unwrap();
    assert_eq!(recent.len(), 2);
}

#[tokio::test]
async fn test_system_status_snapshot() {
    let pool = setup().await;
    let status = SystemStatus::new(None, Some("203.0.113.9".into()));
    let local = LocalDevice {
        system_status_id: 0,
        name: "recon-host".into(),
        ipv4: "192.168.1.50".into(),
        mac: Some("11:22:33:44:55:66".into()),
        vendor: None,
        status: "online".into(),
        hostname: Some("recon-host.local".into()),
    };
    let created = system_status::create(&pool, &status, Some(&local)).await.unwrap();
    assert!(created.id > 0);

    let latest = system_status::latest(&pool).await.unwrap().unwrap();
    assert_eq!(latest.id, created.id);

    let ld = system_status::latest_local_device(&pool, created.id).await.unwrap().unwrap();
    assert_eq!(ld.ipv4, "192.168.1.50");

    // A second snapshot supersedes the first; pruning keeps only the latest.
    let status2 = SystemStatus::new(None, Some("203.0.113.9".into()));
    system_status::create(&pool, &status2, None).await.unwrap();
    system_status::prune_all_but_latest(&pool).await.unwrap();
    let latest2 = system_status::latest(&pool).await.unwrap().unwrap();
    assert_ne!(latest2.id, created.id);
}

#[tokio::test]
async fn test_geolocation_cache_upsert_and_expiry_cleanup() {
    let pool = setup().await;
    let entry = GeolocationCache::new("203.0.113.9".into(), GeoSource::Api);
    geolocation::upsert(&pool, &entry).await.unwrap();

    let fetched = geolocation::find_by_ip(&pool, "203.0.113.9").await.unwrap().unwrap();
    assert_eq!(fetched.source, "api");

    // Force an already-expired row and confirm cleanup removes it.
    let mut expired = entry.clone();
    expired.expires_at = (chrono::Utc::now() - chrono::Duration::days(1)).to_rfc3339();
    geolocation::upsert(&pool, &expired).await.unwrap();

    let removed = geolocation::delete_expired(&pool, &chrono::Utc::now().to_rfc3339()).await.unwrap();
    assert_eq!(removed, 1);
    assert!(geolocation::find_by_ip(&pool, "203.0.113.9").await.unwrap().is_none());
}

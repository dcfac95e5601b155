//! End-to-end reconciliation + status-machine scenarios against a real
//! (in-memory) store. No test here touches a real network or subprocess.

use netrecon_db::{create_test_pool, run_migrations, WriterQueue};
use netrecon_events::{NullEventSink, StoreEventSink};
use netrecon_models::error::CoreError;
use netrecon_models::network::Network;
use netrecon_pipeline::{shared_sink, ReconciliationPipeline, StatusThresholds};
use netrecon_scanner::discovery::DiscoveredHost;
use std::net::Ipv4Addr;
use std::time::Duration;

fn host(ip: [u8; 4], mac: Option<&str>) -> DiscoveredHost {
    DiscoveredHost {
        ipv4: Ipv4Addr::from(ip),
        mac: mac.map(str::to_string),
        hostname: None,
        vendor: None,
    }
}

async fn setup(cidr: &str) -> (ReconciliationPipeline, WriterQueue, Network) {
    let pool = create_test_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let network = Network::new("lan".into(), cidr.into()).unwrap();
    netrecon_db::repo::networks::create_or_update(&pool, &network).await.unwrap();
    let writer = WriterQueue::spawn(pool.clone());
    let pipeline = ReconciliationPipeline::new(pool, writer.clone(), shared_sink(NullEventSink));
    (pipeline, writer, network)
}

#[tokio::test]
async fn test_discovery_tuple_reconciles_then_ages_to_offline() {
    let (pipeline, writer, network) = setup("172.20.0.0/24").await;

    let device = pipeline
        .reconcile(&network, &host([172, 20, 0, 9], Some("00:11:22:33:44:55")))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(device.status, "online");

    // Back-date the sighting directly so the test doesn't depend on
    // wall-clock sleep to simulate staleness.
    let device_id = device.id.clone();
    writer
        .exec_r(move |pool| {
            let device_id = device_id.clone();
            async move {
                sqlx::query("UPDATE devices SET last_seen_online_at = '2000-01-01T00:00:00+00:00' WHERE id = ?")
                    .bind(&device_id)
                    .execute(&pool)
                    .await
                    .map(|_| ())
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await
        .unwrap();

    let transitions = pipeline
        .status_tick(&StatusThresholds::new(Duration::from_secs(180)).unwrap())
        .await
        .unwrap();
    assert_eq!(transitions.went_offline.len(), 1);
    assert_eq!(transitions.went_offline[0].id, device.id);
}

#[tokio::test]
async fn test_dhcp_swap_end_to_end_follows_mac_without_leaving_a_duplicate() {
    let (pipeline, _writer, network) = setup("172.20.0.0/24").await;

    let mac = "aa:bb:cc:dd:ee:ff";
    let first = pipeline
        .reconcile(&network, &host([172, 20, 0, 10], Some(mac)))
        .await
        .unwrap()
        .unwrap();

    let moved = pipeline
        .reconcile(&network, &host([172, 20, 0, 11], Some(mac)))
        .await
        .unwrap()
        .unwrap();

    // The reconciler follows the MAC by overwriting the same row's ipv4
    // rather than inserting a second row, so there is nothing left for the
    // duplicate sweep to clean up.
    assert_eq!(moved.id, first.id);
    assert_eq!(moved.ipv4, "172.20.0.11");
    assert_eq!(pipeline.sweep_duplicates().await.unwrap(), 0);
}

#[tokio::test]
async fn test_device_online_event_logged_through_store_event_sink() {
    let pool = create_test_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let network = Network::new("lan".into(), "172.20.0.0/24".into()).unwrap();
    netrecon_db::repo::networks::create_or_update(&pool, &network).await.unwrap();
    let writer = WriterQueue::spawn(pool.clone());
    let pipeline = ReconciliationPipeline::new(
        pool.clone(),
        writer.clone(),
        shared_sink(StoreEventSink::new(writer.clone())),
    );

    pipeline
        .reconcile(&network, &host([172, 20, 0, 20], None))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let events = writer
        .exec_r(|pool| async move {
            netrecon_db::repo::event_logs::list_recent(&pool, 10)
                .await
                .map_err(|e| CoreError::Other(e.to_string()))
        })
        .await
        .unwrap();
    assert!(events.iter().any(|e| e.event_type == "DeviceOnline"));
}

#[tokio::test]
async fn test_reject_boundary_address_never_reaches_the_store() {
    let (pipeline, _writer, network) = setup("172.20.0.0/24").await;

    let rejected = pipeline.reconcile(&network, &host([172, 20, 0, 255], None)).await.unwrap();
    assert!(rejected.is_none());
}

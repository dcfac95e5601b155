//! Device Reconciler (C5): turns one discovered `(ipv4, mac?, hostname?,
//! vendor?)` tuple into a store write, plus the idempotent duplicate-cleanup
//! sweep that follows up after MAC-preserving IP changes.
//!
//! The IP-then-MAC lookup chain mirrors the teacher's `active.rs::persist_hosts`
//! preserve-existing-field upsert: a device is identified primarily by its
//! current IP, but a MAC match lets a device "follow" a DHCP-assigned address
//! change instead of being treated as a brand new host.

use std::collections::HashMap;

use chrono::Utc;
use netrecon_db::repo::devices;
use netrecon_db::WriterQueue;
use netrecon_events::EventSink;
use netrecon_models::device::{Device, DeviceStatus};
use netrecon_models::error::{CoreError, Result};
use netrecon_models::event::EventType;
use netrecon_models::network::Network;
use netrecon_scanner::discovery::DiscoveredHost;
use sqlx::SqlitePool;

/// Reconcile one discovered host against `network`. Returns `Ok(None)` if
/// the tuple was rejected (network/broadcast address per §4.5 step 1),
/// otherwise the merged `Device` as submitted to the Writer Queue.
pub async fn reconcile(
    pool: &SqlitePool,
    writer: &WriterQueue,
    sink: &dyn EventSink,
    network: &Network,
    host: &DiscoveredHost,
) -> Result<Option<Device>> {
    let cidr: ipnetwork::Ipv4Network = network
        .cidr
        .parse()
        .map_err(|e| CoreError::Validation(format!("invalid CIDR '{}': {e}", network.cidr)))?;
    if host.ipv4 == cidr.network() || host.ipv4 == cidr.broadcast() {
        return Ok(None);
    }
    let ipv4 = host.ipv4.to_string();

    let mut existing = devices::get_by_ip(pool, &ipv4)
        .await
        .map_err(|e| CoreError::Other(e.to_string()))?;
    if existing.is_none() {
        if let Some(mac) = host.mac.as_deref() {
            existing = devices::get_by_mac(pool, mac)
                .await
                .map_err(|e| CoreError::Other(e.to_string()))?;
        }
    }

    let first_sighting = existing.is_none();
    let was_online = existing
        .as_ref()
        .map(|d| d.status_enum() == DeviceStatus::Online)
        .unwrap_or(false);

    let now = Utc::now().to_rfc3339();
    let (device, relocated) = match existing {
        Some(mut prev) => {
            let relocated = prev.ipv4 != ipv4;
            prev.ipv4 = ipv4;
            prev.network_id = network.id.clone();
            if let Some(mac) = &host.mac {
                prev.mac = Some(mac.clone());
            }
            if let Some(hostname) = &host.hostname {
                prev.hostname = Some(hostname.clone());
            }
            if let Some(vendor) = &host.vendor {
                prev.vendor = Some(vendor.clone());
            }
            prev.status = DeviceStatus::Online.as_str().to_string();
            prev.last_seen_online_at = Some(now.clone());
            prev.updated_at = now;
            (prev, relocated)
        }
        None => {
            let mut device = Device::new(ipv4, network.id.clone());
            device.mac = host.mac.clone();
            device.hostname = host.hostname.clone();
            device.vendor = host.vendor.clone();
            (device, false)
        }
    };

    // A MAC match at a changed IP moves the existing row rather than
    // colliding with it: `upsert`'s `ON CONFLICT(ipv4)` only fires when the
    // new IP already belongs to this device, so the row has to be relocated
    // by id first.
    let submitted = writer
        .exec_r(move |pool| {
            let device = device.clone();
            async move {
                if relocated {
                    devices::relocate_ip(&pool, &device.id, &device.ipv4)
                        .await
                        .map_err(|e| CoreError::Other(e.to_string()))?;
                }
                devices::upsert(&pool, &device)
                    .await
                    .map(|_| device)
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await?;

    if first_sighting || !was_online {
        sink.emit(
            EventType::DeviceOnline,
            format!("{} is online", submitted.ipv4),
            Some(submitted.id.clone()),
        )
        .await?;
    }

    Ok(Some(submitted))
}

/// Idempotent duplicate-cleanup sweep (§4.5 final paragraph): group devices
/// by non-empty MAC, keep the most recently updated row, merge non-empty
/// `name`/`comment` from the duplicates into the keeper, delete the rest.
/// Runs entirely inside one Writer Queue submission so it never interleaves
/// with a concurrent reconcile of the same MAC.
pub async fn sweep_duplicates(writer: &WriterQueue) -> Result<usize> {
    writer
        .exec_r(|pool| async move {
            let all = devices::list_all(&pool)
                .await
                .map_err(|e| CoreError::Other(e.to_string()))?;

            let mut groups: HashMap<String, Vec<Device>> = HashMap::new();
            for device in all {
                if let Some(mac) = device.mac.clone().filter(|m| !m.is_empty()) {
                    groups.entry(mac).or_default().push(device);
                }
            }

            let mut removed = 0usize;
            for (_, mut group) in groups {
                if group.len() < 2 {
                    continue;
                }
                group.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                let mut keeper = group.remove(0);
                let mut keeper_changed = false;
                for dup in &group {
                    if keeper.name.as_deref().unwrap_or("").is_empty() {
                        if let Some(name) = dup.name.clone().filter(|n| !n.is_empty()) {
                            keeper.name = Some(name);
                            keeper_changed = true;
                        }
                    }
                    if keeper.comment.as_deref().unwrap_or("").is_empty() {
                        if let Some(comment) = dup.comment.clone().filter(|c| !c.is_empty()) {
                            keeper.comment = Some(comment);
                            keeper_changed = true;
                        }
                    }
                }
                if keeper_changed {
                    devices::upsert(&pool, &keeper)
                        .await
                        .map_err(|e| CoreError::Other(e.to_string()))?;
                }
                for dup in group {
                    devices::delete(&pool, &dup.id)
                        .await
                        .map_err(|e| CoreError::Other(e.to_string()))?;
                    removed += 1;
                }
            }
            Ok(removed)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use netrecon_db::{create_test_pool, run_migrations};
    use netrecon_events::{NullEventSink, StoreEventSink};
    use netrecon_models::network::Network;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    async fn setup() -> (SqlitePool, WriterQueue, Network) {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let queue = WriterQueue::spawn(pool.clone());
        let network = Network::new("lan".into(), "192.168.1.0/24".into()).unwrap();
        networks_create(&pool, &network).await;
        (pool, queue, network)
    }

    async fn networks_create(pool: &SqlitePool, network: &Network) {
        netrecon_db::repo::networks::create_or_update(pool, network)
            .await
            .unwrap();
    }

    fn host(ip: [u8; 4], mac: Option<&str>, hostname: Option<&str>) -> DiscoveredHost {
        DiscoveredHost {
            ipv4: Ipv4Addr::from(ip),
            mac: mac.map(str::to_string),
            hostname: hostname.map(str::to_string),
            vendor: None,
        }
    }

    #[tokio::test]
    async fn test_reject_network_and_broadcast_addresses() {
        let (pool, queue, network) = setup().await;
        let sink = NullEventSink;
        let net_addr = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 0], None, None))
            .await
            .unwrap();
        let bcast = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 255], None, None))
            .await
            .unwrap();
        assert!(net_addr.is_none());
        assert!(bcast.is_none());
    }

    #[tokio::test]
    async fn test_first_sighting_creates_device_online() {
        let (pool, queue, network) = setup().await;
        let sink = NullEventSink;
        let result = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 10], Some("aa:bb:cc:dd:ee:ff"), Some("box")))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.ipv4, "192.168.1.10");
        assert_eq!(result.status, "online");
        assert_eq!(result.mac.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
        assert_eq!(result.hostname.as_deref(), Some("box"));
    }

    #[tokio::test]
    async fn test_dhcp_swap_follows_mac_to_new_ip() {
        let (pool, queue, network) = setup().await;
        let sink = NullEventSink;
        let first = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 10], Some("aa:bb:cc:dd:ee:ff"), Some("box")))
            .await
            .unwrap()
            .unwrap();

        let moved = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 11], Some("aa:bb:cc:dd:ee:ff"), None))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(moved.id, first.id, "same device should follow its MAC to the new IP");
        assert_eq!(moved.ipv4, "192.168.1.11");
        // hostname from the prior sighting is preserved since this tuple had none.
        assert_eq!(moved.hostname.as_deref(), Some("box"));
    }

    #[tokio::test]
    async fn test_user_edited_fields_preserved_across_resightings() {
        let (pool, queue, network) = setup().await;
        let sink = NullEventSink;
        let mut first = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 10], Some("aa:bb:cc:dd:ee:ff"), Some("box")))
            .await
            .unwrap()
            .unwrap();
        first.name = Some("Office NAS".into());
        first.comment = Some("top shelf".into());
        queue
            .exec_r(move |pool| {
                let first = first.clone();
                async move {
                    devices::upsert(&pool, &first).await.map_err(|e| CoreError::Other(e.to_string()))
                }
            })
            .await
            .unwrap();

        let resighted = reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 10], Some("aa:bb:cc:dd:ee:ff"), Some("box")))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(resighted.name.as_deref(), Some("Office NAS"));
        assert_eq!(resighted.comment.as_deref(), Some("top shelf"));
    }

    #[tokio::test]
    async fn test_device_online_event_emitted_on_first_sighting() {
        let pool = create_test_pool().await.unwrap();
        run_migrations(&pool).await.unwrap();
        let queue = WriterQueue::spawn(pool.clone());
        let network = Network::new("lan".into(), "192.168.1.0/24".into()).unwrap();
        networks_create(&pool, &network).await;
        let sink = StoreEventSink::new(queue.clone());

        reconcile(&pool, &queue, &sink, &network, &host([192, 168, 1, 20], None, None))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let events = queue
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
    async fn test_sweep_duplicates_keeps_newest_and_merges_names() {
        let (pool, queue, network) = setup().await;

        let mut older = Device::new("192.168.1.30".into(), network.id.clone());
        older.mac = Some("11:22:33:44:55:66".into());
        older.name = Some("Kept Name".into());
        older.updated_at = "2020-01-01T00:00:00+00:00".into();
        devices::insert(&pool, &older).await.unwrap();

        let mut newer = Device::new("192.168.1.31".into(), network.id.clone());
        newer.mac = Some("11:22:33:44:55:66".into());
        newer.updated_at = "2030-01-01T00:00:00+00:00".into();
        devices::insert(&pool, &newer).await.unwrap();

        let removed = sweep_duplicates(&queue).await.unwrap();
        assert_eq!(removed, 1);

        let remaining = devices::list_all(&pool).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].ipv4, "192.168.1.31");
        assert_eq!(remaining[0].name.as_deref(), Some("Kept Name"));
    }

    #[tokio::test]
    async fn test_sweep_duplicates_leaves_unique_macs_alone() {
        let (pool, queue, network) = setup().await;
        let mut a = Device::new("192.168.1.40".into(), network.id.clone());
        a.mac = Some("aa:aa:aa:aa:aa:aa".into());
        devices::insert(&pool, &a).await.unwrap();

        let removed = sweep_duplicates(&queue).await.unwrap();
        assert_eq!(removed, 0);
        assert_eq!(devices::list_all(&pool).await.unwrap().len(), 1);
    }
}

//! Host Discovery (C4): sweep a CIDR range for live hosts and resolve as much
//! identity as possible (MAC, hostname, vendor) without yet touching the
//! store — the Reconciler decides what to persist.
//!
//! Ordering per §4.4: ICMP echo first; a host that doesn't answer ICMP but
//! has an ARP entry still counts as live (many hosts block ping but still
//! answer at L2). Hostname resolution tries reverse DNS, then NetBIOS, then
//! a literal `<ip>.local` mDNS-style forward lookup, in that order, each
//! best-effort and non-fatal.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use ipnetwork::Ipv4Network;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use netrecon_platform::arp::ArpEntry;

use crate::oui::OuiTable;

const ICMP_TIMEOUT: Duration = Duration::from_secs(3);
const TCP_PROBE_TIMEOUT: Duration = Duration::from_millis(500);
const DNS_TIMEOUT: Duration = Duration::from_secs(2);
const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Common ports tried as a liveness fallback when ICMP is blocked or
/// unavailable (permission denied running unprivileged, or the host simply
/// doesn't answer echo requests) — §4.4 step 2.
const FALLBACK_PROBE_PORTS: &[u16] = &[80, 443, 22, 21, 23, 25, 53, 135, 139, 445];

/// One host found alive during a sweep, with whatever identity could be
/// resolved in the same pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveredHost {
    pub ipv4: Ipv4Addr,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
}

/// Enumerate every usable host address in `network`, excluding the network
/// and broadcast addresses (§8 B1/B2: a /24 yields 254 hosts, a /23 yields
/// 510).
pub fn enumerate_hosts(network: Ipv4Network) -> Vec<Ipv4Addr> {
    let network_addr = network.network();
    let broadcast_addr = network.broadcast();
    network
        .iter()
        .filter(|ip| *ip != network_addr && *ip != broadcast_addr)
        .collect()
}

/// Derive a deterministic ICMP identifier from an address's last two octets
/// so concurrent pings in the same sweep don't collide.
fn icmp_identifier(ip: Ipv4Addr) -> u16 {
    let octets = ip.octets();
    u16::from_be_bytes([octets[2], octets[3]])
}

/// Send one ICMP echo request and return whether a reply arrived within
/// `ICMP_TIMEOUT`.
async fn ping_host(client: &surge_ping::Client, ip: Ipv4Addr) -> bool {
    let mut pinger = client
        .pinger(ip.into(), surge_ping::PingIdentifier(icmp_identifier(ip)))
        .await;
    pinger.timeout(ICMP_TIMEOUT);
    let payload = [0u8; 8];
    pinger
        .ping(surge_ping::PingSequence(0), &payload)
        .await
        .is_ok()
}

/// True if any port in `FALLBACK_PROBE_PORTS` accepts a TCP connection
/// within `TCP_PROBE_TIMEOUT` — the liveness fallback for hosts that block
/// or don't answer ICMP.
async fn tcp_probe_alive(ip: Ipv4Addr) -> bool {
    tcp_probe_alive_on(ip, FALLBACK_PROBE_PORTS).await
}

async fn tcp_probe_alive_on(ip: Ipv4Addr, ports: &[u16]) -> bool {
    for &port in ports {
        let addr = SocketAddr::new(ip.into(), port);
        if tokio::time::timeout(TCP_PROBE_TIMEOUT, TcpStream::connect(addr))
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false)
        {
            return true;
        }
    }
    false
}

/// Resolve a hostname for `ip`, trying reverse DNS, then NetBIOS, then a
/// literal `<ip>.local` forward lookup, then an HTTP `Server`/`Location`
/// header (§4.4, §9 — the mDNS fallback is intentionally a forward lookup
/// of the literal `.local` name, matching the spec's wording rather than
/// true mDNS reverse resolution).
async fn resolve_hostname(ip: Ipv4Addr) -> Option<String> {
    if let Some(name) = reverse_dns(ip).await {
        return Some(name);
    }
    if let Some(name) = netrecon_platform::netbios::query_netbios_name(ip.into()).await {
        return Some(name);
    }
    if let Some(name) = mdns_local_fallback(ip).await {
        return Some(name);
    }
    http_header_fallback(ip).await
}

/// Best-effort HTTP probe of port 80, returning the `Server` header (or
/// `Location` host, if present) as a last-resort identity signal.
async fn http_header_fallback(ip: Ipv4Addr) -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(HTTP_PROBE_TIMEOUT)
        .build()
        .ok()?;
    let response = client.get(format!("http://{ip}/")).send().await.ok()?;
    if let Some(server) = response
        .headers()
        .get(reqwest::header::SERVER)
        .and_then(|v| v.to_str().ok())
    {
        return Some(server.to_string());
    }
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

async fn reverse_dns(ip: Ipv4Addr) -> Option<String> {
    let result = tokio::time::timeout(
        DNS_TIMEOUT,
        tokio::task::spawn_blocking(move || dns_lookup::lookup_addr(&ip.into())),
    )
    .await
    .ok()?
    .ok()?;
    result.ok().filter(|s| !s.is_empty())
}

async fn mdns_local_fallback(ip: Ipv4Addr) -> Option<String> {
    let query = format!("{ip}.local");
    let lookup_query = query.clone();
    let result = tokio::time::timeout(
        DNS_TIMEOUT,
        tokio::task::spawn_blocking(move || dns_lookup::lookup_host(&lookup_query)),
    )
    .await
    .ok()?
    .ok()?;
    result.ok().filter(|addrs| !addrs.is_empty()).map(|_| query)
}

/// Sweep every host in `network` with up to `concurrency` probes in flight
/// at once, resolving MAC (from a freshly-read ARP table, provoking entries
/// for hosts that answered ICMP but have no ARP entry yet) and hostname and
/// vendor for each live host found.
pub async fn sweep(
    network: Ipv4Network,
    concurrency: usize,
    oui_table: &OuiTable,
) -> Vec<DiscoveredHost> {
    let hosts = enumerate_hosts(network);
    let Ok(client) = surge_ping::Client::new(&surge_ping::Config::default()) else {
        tracing::warn!("failed to create ICMP client, discovery sweep skipped");
        return Vec::new();
    };
    let client = Arc::new(client);
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));

    let mut alive = Vec::new();
    let mut set = JoinSet::new();
    for ip in hosts {
        let client = Arc::clone(&client);
        let semaphore = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok()?;
            if ping_host(&client, ip).await || tcp_probe_alive(ip).await {
                Some(ip)
            } else {
                None
            }
        });
    }
    while let Some(result) = set.join_next().await {
        if let Ok(Some(ip)) = result {
            alive.push(ip);
        }
    }

    if alive.is_empty() {
        return Vec::new();
    }

    let arp_table = netrecon_platform::arp::read_arp_table()
        .await
        .unwrap_or_default();

    let mut discovered = Vec::with_capacity(alive.len());
    for ip in alive {
        let mac = resolve_mac(&arp_table, ip).await;
        let hostname = resolve_hostname(ip).await;
        let vendor = mac.as_deref().and_then(|mac| oui_table.lookup(mac));
        discovered.push(DiscoveredHost {
            ipv4: ip,
            mac,
            hostname,
            vendor,
        });
    }
    discovered
}

/// Find `ip`'s MAC in `arp_table`; if absent, provoke ARP resolution and
/// re-read once before giving up (§4.4).
async fn resolve_mac(arp_table: &[ArpEntry], ip: Ipv4Addr) -> Option<String> {
    if let Some(mac) = netrecon_platform::arp::find_mac(arp_table, &ip.to_string()) {
        return Some(mac);
    }
    let _ = netrecon_platform::arp::provoke_arp(ip.into());
    tokio::time::sleep(Duration::from_millis(200)).await;
    let refreshed = netrecon_platform::arp::read_arp_table().await.ok()?;
    netrecon_platform::arp::find_mac(&refreshed, &ip.to_string())
}

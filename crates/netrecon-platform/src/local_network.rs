//! Local IPv4/subnet detection (§10.6), used by the Scan Manager to seed
//! `SystemStatus`/`LocalDevice` and to emit `LocalIPFound`/`LocalNetworkFound`
//! on first detection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use ipnetwork::Ipv4Network;

/// Discover the host's primary outbound IPv4 address by "connecting" a UDP
/// socket to a public address and reading back the local endpoint the
/// kernel chose — no packet is actually sent.
pub fn local_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket
        .connect(SocketAddr::from((IpAddr::from([8, 8, 8, 8]), 80)))
        .ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(addr) => Some(addr),
        IpAddr::V6(_) => None,
    }
}

/// Derive the /24 network containing `ip`, the common default for the
/// "local network" this engine discovers against absent an explicit
/// `network_range` config value.
pub fn assume_local_network(ip: Ipv4Addr) -> Option<Ipv4Network> {
    let candidate = Ipv4Network::new(ip, 24).ok()?;
    Ipv4Network::new(candidate.network(), 24).ok()
}

//! ARP table reading (§4.4 "MAC via ARP": read the OS ARP table; if absent,
//! send a UDP packet to provoke ARP and re-read).
//!
//! Pure parsing functions for each platform's table format, plus a real
//! `read_arp_table` that shells out and a `provoke_arp` that sends a
//! throwaway UDP datagram to force the kernel to populate an entry.

use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::detect::{detect_platform, OsType};

/// One resolved MAC-address entry from the local ARP/neighbor table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: String,
    pub mac: String,
}

/// Parse `ip neigh` output (Linux): `192.168.1.1 dev eth0 lladdr aa:bb:cc:dd:ee:ff REACHABLE`.
pub fn parse_ip_neigh(output: &str) -> Vec<ArpEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let ip = fields.next()?.to_string();
            let mut mac = None;
            let mut prev = "";
            for field in fields {
                if prev == "lladdr" {
                    mac = Some(field.to_string());
                    break;
                }
                prev = field;
            }
            mac.map(|mac| ArpEntry { ip, mac })
        })
        .collect()
}

/// Parse BSD/macOS `arp -an` output: `? (192.168.1.1) at aa:bb:cc:dd:ee:ff on en0 ifscope [ethernet]`.
pub fn parse_arp_an(output: &str) -> Vec<ArpEntry> {
    output
        .lines()
        .filter_map(|line| {
            let ip_start = line.find('(')?;
            let ip_end = line.find(')')?;
            let ip = line[ip_start + 1..ip_end].to_string();
            let rest = &line[ip_end + 1..];
            let at_idx = rest.find("at ")?;
            let mac = rest[at_idx + 3..].split_whitespace().next()?.to_string();
            if mac == "(incomplete)" {
                return None;
            }
            Some(ArpEntry { ip, mac })
        })
        .collect()
}

/// Parse Windows `arp -a` output: `  192.168.1.1          aa-bb-cc-dd-ee-ff     dynamic`.
pub fn parse_arp_a_windows(output: &str) -> Vec<ArpEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let ip = fields.next()?;
            if ip.parse::<IpAddr>().is_err() {
                return None;
            }
            let mac = fields.next()?.replace('-', ":");
            Some(ArpEntry {
                ip: ip.to_string(),
                mac,
            })
        })
        .collect()
}

/// Read the OS's ARP/neighbor table and return every resolved entry.
pub async fn read_arp_table() -> Result<Vec<ArpEntry>, std::io::Error> {
    let platform = detect_platform();
    let (cmd, args): (&str, &[&str]) = match platform {
        OsType::Linux => ("ip", &["neigh"]),
        OsType::MacOs => ("arp", &["-an"]),
        OsType::Windows => ("arp", &["-a"]),
        OsType::Unknown => return Ok(Vec::new()),
    };
    let output = tokio::process::Command::new(cmd).args(args).output().await?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(match platform {
        OsType::Linux => parse_ip_neigh(&stdout),
        OsType::MacOs => parse_arp_an(&stdout),
        OsType::Windows => parse_arp_a_windows(&stdout),
        OsType::Unknown => Vec::new(),
    })
}

/// Send a zero-length UDP datagram to `target:9` (the discard port) to
/// provoke the kernel into resolving and caching the target's MAC address,
/// so a follow-up ARP table read finds it.
pub fn provoke_arp(target: IpAddr) -> std::io::Result<()> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.send_to(&[], SocketAddr::new(target, 9))?;
    Ok(())
}

/// Look up one IP's MAC address from a previously-read table.
pub fn find_mac(entries: &[ArpEntry], ip: &str) -> Option<String> {
    entries.iter().find(|e| e.ip == ip).map(|e| e.mac.clone())
}

//! NetBIOS name query (NBSTAT), used as a hostname fallback when reverse DNS
//! comes up empty (§4.4: "fall back to NetBIOS name query, mDNS, or HTTP
//! Server/Location header").

use std::net::IpAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::timeout;

const NBSTAT_QUERY: [u8; 51] = [
    0x82, 0x28, // transaction id
    0x00, 0x00, // flags
    0x00, 0x01, // questions
    0x00, 0x00, // answer RRs
    0x00, 0x00, // authority RRs
    0x00, 0x00, // additional RRs
    0x20, // name length
    0x43, 0x4b, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x00, // encoded wildcard name + null label
    0x00, 0x21, // qtype NBSTAT
    0x00, 0x01, // qclass IN
];

/// Query `ip:137` for its NetBIOS name table and return the first name
/// found, trimmed of the padding NetBIOS uses to fill a 16-byte field.
pub async fn query_netbios_name(ip: IpAddr) -> Option<String> {
    let socket = UdpSocket::bind("0.0.0.0:0").await.ok()?;
    socket.send_to(&NBSTAT_QUERY, (ip, 137)).await.ok()?;

    let mut buf = [0u8; 1024];
    let n = timeout(Duration::from_millis(500), socket.recv(&mut buf))
        .await
        .ok()?
        .ok()?;
    parse_nbstat_response(&buf[..n])
}

/// Parse an NBSTAT response, pulling the first 15-byte name field out of the
/// name table that follows the fixed header + question/answer section.
fn parse_nbstat_response(data: &[u8]) -> Option<String> {
    // Header (12 bytes) + resource record name/type/class/ttl/rdlength (up to
    // the name count byte), then num_names (1 byte) followed by 18-byte
    // entries (15-byte padded name + 1 type byte + 2 flag bytes).
    const HEADER_AND_RR_PREFIX: usize = 12 + 1 + 2 + 2 + 4 + 2 + 2;
    if data.len() <= HEADER_AND_RR_PREFIX {
        return None;
    }
    let name_count = data[HEADER_AND_RR_PREFIX - 1] as usize;
    if name_count == 0 {
        return None;
    }
    let entry_start = HEADER_AND_RR_PREFIX;
    if data.len() < entry_start + 15 {
        return None;
    }
    let raw = &data[entry_start..entry_start + 15];
    let name = String::from_utf8_lossy(raw).trim_end().to_string();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

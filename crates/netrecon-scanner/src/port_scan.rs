//! Port Scanner (C7): shell out to an external port-scanning tool and parse
//! its XML report, plus a follow-up OS-detection pass.
//!
//! Grounded in the teacher's `executor.rs`: locate the binary, decide
//! `-sS` vs `-sT` from the process's privilege level, spawn with a hard
//! timeout, and parse the result with `netrecon_parsers`.

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::time::Duration;

use netrecon_models::port::{Port, PortProtocol, PortState};
use netrecon_parsers::os_detect::{parse_os_detect_xml, OsMatch};
use netrecon_parsers::port_scan::parse_port_scan_xml;

const SCAN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum PortScanError {
    #[error("scanner binary not found")]
    BinaryNotFound,
    #[error("scan process failed: {0}")]
    ProcessFailed(String),
    #[error("scan timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to parse scan output: {0}")]
    ParseFailed(String),
}

/// Candidate install locations checked when the binary isn't on `PATH`.
fn fallback_paths() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Program Files (x86)\Nmap\nmap.exe"),
            PathBuf::from(r"C:\Program Files\Nmap\nmap.exe"),
        ]
    } else {
        vec![
            PathBuf::from("/usr/bin/nmap"),
            PathBuf::from("/usr/local/bin/nmap"),
            PathBuf::from("/opt/homebrew/bin/nmap"),
        ]
    }
}

/// Locate the external port-scanner binary on `PATH`, falling back to a
/// list of well-known install locations.
pub fn find_scanner_binary() -> Option<PathBuf> {
    let which_cmd = if cfg!(target_os = "windows") { "where" } else { "which" };
    if let Ok(output) = std::process::Command::new(which_cmd).arg("nmap").output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).lines().next()?.trim().to_string();
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }
    }
    fallback_paths().into_iter().find(|p| p.exists())
}

/// Choose `-sS` (SYN, requires elevation) when the process is elevated,
/// `-sT` (connect scan) otherwise.
fn scan_type_flag() -> &'static str {
    if netrecon_platform::privileges::is_elevated() {
        "-sS"
    } else {
        "-sT"
    }
}

fn build_args(target: Ipv4Addr, output_path: &str) -> Vec<String> {
    vec![
        scan_type_flag().to_string(),
        "-T4".to_string(),
        "-oX".to_string(),
        output_path.to_string(),
        target.to_string(),
    ]
}

fn build_os_detect_args(target: Ipv4Addr, output_path: &str) -> Vec<String> {
    vec![
        "-O".to_string(),
        "-oX".to_string(),
        output_path.to_string(),
        target.to_string(),
    ]
}

/// Run the external port scanner against `target`, returning every port it
/// reports in any state (open/filtered/closed — the caller decides what to
/// persist).
pub async fn scan_ports(binary: &PathBuf, target: Ipv4Addr) -> Result<Vec<Port>, PortScanError> {
    let tmp_path = std::env::temp_dir().join(format!("netrecon-portscan-{target}.xml"));
    let tmp_str = tmp_path.to_string_lossy().to_string();
    let args = build_args(target, &tmp_str);

    let output = tokio::time::timeout(
        SCAN_TIMEOUT,
        tokio::process::Command::new(binary).args(&args).output(),
    )
    .await
    .map_err(|_| PortScanError::TimedOut(SCAN_TIMEOUT))?
    .map_err(|e| PortScanError::ProcessFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(PortScanError::ProcessFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let xml = tokio::fs::read_to_string(&tmp_path)
        .await
        .map_err(|e| PortScanError::ProcessFailed(e.to_string()))?;
    let _ = tokio::fs::remove_file(&tmp_path).await;

    let parsed = parse_port_scan_xml(&xml).map_err(PortScanError::ParseFailed)?;
    Ok(ports_from_parsed(&parsed))
}

fn ports_from_parsed(parsed: &netrecon_parsers::port_scan::PortScanResult) -> Vec<Port> {
    let mut ports = Vec::new();
    for host in &parsed.hosts {
        for port in &host.ports {
            let protocol = match port.protocol.as_str() {
                "udp" => PortProtocol::Udp,
                _ => PortProtocol::Tcp,
            };
            let state = match port.state.as_str() {
                "open" => PortState::Open,
                "filtered" => PortState::Filtered,
                _ => PortState::Closed,
            };
            let mut p = Port::new(String::new(), port.port, protocol, state);
            p.service = port.service.get("name").cloned();
            ports.push(p);
        }
    }
    ports
}

/// Run the external OS-detection pass against `target` and return the
/// first/best match, if any.
pub async fn detect_os(binary: &PathBuf, target: Ipv4Addr) -> Result<Option<OsMatch>, PortScanError> {
    let tmp_path = std::env::temp_dir().join(format!("netrecon-osdetect-{target}.xml"));
    let tmp_str = tmp_path.to_string_lossy().to_string();
    let args = build_os_detect_args(target, &tmp_str);

    let output = tokio::time::timeout(
        SCAN_TIMEOUT,
        tokio::process::Command::new(binary).args(&args).output(),
    )
    .await
    .map_err(|_| PortScanError::TimedOut(SCAN_TIMEOUT))?
    .map_err(|e| PortScanError::ProcessFailed(e.to_string()))?;

    if !output.status.success() {
        return Err(PortScanError::ProcessFailed(
            String::from_utf8_lossy(&output.stderr).to_string(),
        ));
    }

    let xml = tokio::fs::read_to_string(&tmp_path)
        .await
        .map_err(|e| PortScanError::ProcessFailed(e.to_string()))?;
    let _ = tokio::fs::remove_file(&tmp_path).await;

    parse_os_detect_xml(&xml).map_err(PortScanError::ParseFailed)
}

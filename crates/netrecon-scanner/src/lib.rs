//! Network scanning engine: host discovery, OUI lookup, port scanning, web
//! probing, and device fingerprinting. Stateless by design — nothing here
//! touches the store or emits events; orchestration (persistence, event
//! emission, scheduling) belongs to `netrecon-pipeline` and `netrecon-scan`.

pub mod discovery;
pub mod fingerprint;
pub mod oui;
pub mod port_scan;
pub mod web_probe;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScannerError {
    #[error("port scan error: {0}")]
    PortScan(#[from] port_scan::PortScanError),
    #[error("web probe error: {0}")]
    WebProbe(#[from] web_probe::WebProbeError),
}

pub type ScannerResult<T> = Result<T, ScannerError>;

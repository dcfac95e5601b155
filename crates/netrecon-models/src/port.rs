//! Port model types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Transport protocol of a port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortProtocol {
    Tcp,
    Udp,
}

impl PortProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "udp" => Self::Udp,
            _ => Self::Tcp,
        }
    }
}

/// Observed state of a port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortState {
    Open,
    Filtered,
    Closed,
}

impl PortState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Filtered => "filtered",
            Self::Closed => "closed",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "open" => Self::Open,
            "closed" => Self::Closed,
            _ => Self::Filtered,
        }
    }
}

/// A port observed on a device during a port scan. Owned by exactly one
/// Device; a successful scan replaces the whole set for that device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Port {
    pub id: String,
    pub device_id: String,
    pub number: String,
    pub protocol: String,
    pub state: String,
    pub service: Option<String>,
}

impl Port {
    pub fn new(device_id: String, number: u16, protocol: PortProtocol, state: PortState) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id,
            number: number.to_string(),
            protocol: protocol.as_str().to_string(),
            state: state.as_str().to_string(),
            service: None,
        }
    }

    pub fn protocol_enum(&self) -> PortProtocol {
        PortProtocol::from_str_lossy(&self.protocol)
    }

    pub fn state_enum(&self) -> PortState {
        PortState::from_str_lossy(&self.state)
    }

    /// True if this port's number or service name looks like an HTTP(S)
    /// surface. Mirrors the "web port" detection used by the Web Prober:
    /// deliberately loose, matching on service name too, even for ports
    /// outside the known web-port table.
    pub fn looks_like_web(&self) -> bool {
        const HTTP_PORTS: &[&str] = &["80", "8080", "8000", "8008", "8081", "9000", "3000", "5000"];
        const HTTPS_PORTS: &[&str] = &["443", "8443"];
        if HTTP_PORTS.contains(&self.number.as_str()) || HTTPS_PORTS.contains(&self.number.as_str()) {
            return true;
        }
        self.service
            .as_deref()
            .map(|s| {
                let s = s.to_ascii_lowercase();
                s.contains("http") || s.contains("web")
            })
            .unwrap_or(false)
    }

    /// `https` if the port number is in the HTTPS set, otherwise `http`.
    pub fn web_protocol(&self) -> &'static str {
        if matches!(self.number.as_str(), "443" | "8443") {
            "https"
        } else {
            "http"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_serde_roundtrip() {
        let port = Port::new("dev-1".into(), 443, PortProtocol::Tcp, PortState::Open);
        let json = serde_json::to_string(&port).unwrap();
        let back: Port = serde_json::from_str(&json).unwrap();
        assert_eq!(back.number, "443");
        assert_eq!(back.protocol, "tcp");
        assert_eq!(back.device_id, "dev-1");
    }

    #[test]
    fn test_protocol_state_roundtrip() {
        for p in [PortProtocol::Tcp, PortProtocol::Udp] {
            assert_eq!(PortProtocol::from_str_lossy(p.as_str()), p);
        }
        for s in [PortState::Open, PortState::Filtered, PortState::Closed] {
            assert_eq!(PortState::from_str_lossy(s.as_str()), s);
        }
    }

    #[test]
    fn test_looks_like_web_by_number() {
        let p = Port::new("d".into(), 8080, PortProtocol::Tcp, PortState::Open);
        assert!(p.looks_like_web());
        assert_eq!(p.web_protocol(), "http");
    }

    #[test]
    fn test_looks_like_web_by_service_name_outside_table() {
        // §9 ambiguity — preserved: a non-standard port with "http" in its
        // service name still counts.
        let mut p = Port::new("d".into(), 9999, PortProtocol::Tcp, PortState::Open);
        p.service = Some("custom-http-admin".into());
        assert!(p.looks_like_web());
    }

    #[test]
    fn test_non_web_port_not_flagged() {
        let p = Port::new("d".into(), 22, PortProtocol::Tcp, PortState::Open);
        assert!(!p.looks_like_web());
    }

    #[test]
    fn test_https_port_protocol() {
        let p = Port::new("d".into(), 8443, PortProtocol::Tcp, PortState::Open);
        assert_eq!(p.web_protocol(), "https");
    }
}

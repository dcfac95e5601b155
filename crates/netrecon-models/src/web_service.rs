//! WebService model: an HTTP(S) response fingerprint for one port.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Scheme a WebService was probed over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WebProtocol {
    Http,
    Https,
}

impl WebProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "https" => Self::Https,
            _ => Self::Http,
        }
    }
}

/// Owned by exactly one Device; replaced as a set per probe pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct WebService {
    pub id: String,
    pub device_id: String,
    pub url: String,
    pub title: Option<String>,
    pub server: Option<String>,
    pub status_code: i64,
    pub content_type: Option<String>,
    pub size: i64,
    pub screenshot: Option<String>,
    pub port: String,
    pub protocol: String,
    pub scanned_at: String,
}

impl WebService {
    pub fn new(device_id: String, url: String, port: String, protocol: WebProtocol) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            device_id,
            url,
            title: None,
            server: None,
            status_code: 0,
            content_type: None,
            size: 0,
            screenshot: None,
            port,
            protocol: protocol.as_str().to_string(),
            scanned_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn protocol_enum(&self) -> WebProtocol {
        WebProtocol::from_str_lossy(&self.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_service_serde_roundtrip() {
        let ws = WebService::new(
            "dev-1".into(),
            "https://192.168.1.1:443/".into(),
            "443".into(),
            WebProtocol::Https,
        );
        let json = serde_json::to_string(&ws).unwrap();
        let back: WebService = serde_json::from_str(&json).unwrap();
        assert_eq!(back.protocol, "https");
        assert_eq!(back.port, "443");
    }

    #[test]
    fn test_web_protocol_roundtrip() {
        for p in [WebProtocol::Http, WebProtocol::Https] {
            assert_eq!(WebProtocol::from_str_lossy(p.as_str()), p);
        }
    }
}

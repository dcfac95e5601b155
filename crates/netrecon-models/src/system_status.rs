//! SystemStatus: a snapshot of the local host's view, recreated each
//! top-of-loop of the Scan Manager.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Subset of Device describing the machine the engine itself runs on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LocalDevice {
    pub system_status_id: i64,
    pub name: String,
    pub ipv4: String,
    pub mac: Option<String>,
    pub vendor: Option<String>,
    pub status: String,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SystemStatus {
    pub id: i64,
    pub network_id: Option<String>,
    pub public_ip: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SystemStatus {
    pub fn new(network_id: Option<String>, public_ip: Option<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: 0,
            network_id,
            public_ip,
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_status_serde_roundtrip() {
        let s = SystemStatus::new(Some("net-1".into()), Some("203.0.113.9".into()));
        let json = serde_json::to_string(&s).unwrap();
        let back: SystemStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back.network_id, Some("net-1".to_string()));
        assert_eq!(back.public_ip, Some("203.0.113.9".to_string()));
    }
}

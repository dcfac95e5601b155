//! Device model types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a device, driven by elapsed time since last sighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Unknown,
    Online,
    Idle,
    Offline,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Offline => "offline",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "online" => Self::Online,
            "idle" => Self::Idle,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// Classification of a network device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Unknown,
    Router,
    Switch,
    Nas,
    Printer,
    Camera,
    Server,
    Workstation,
    Laptop,
    Mobile,
    Iot,
    AccessPoint,
    Firewall,
    Voip,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Router => "router",
            Self::Switch => "switch",
            Self::Nas => "nas",
            Self::Printer => "printer",
            Self::Camera => "camera",
            Self::Server => "server",
            Self::Workstation => "workstation",
            Self::Laptop => "laptop",
            Self::Mobile => "mobile",
            Self::Iot => "iot",
            Self::AccessPoint => "access_point",
            Self::Firewall => "firewall",
            Self::Voip => "voip",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "router" => Self::Router,
            "switch" => Self::Switch,
            "nas" => Self::Nas,
            "printer" => Self::Printer,
            "camera" => Self::Camera,
            "server" => Self::Server,
            "workstation" => Self::Workstation,
            "laptop" => Self::Laptop,
            "mobile" => Self::Mobile,
            "iot" => Self::Iot,
            "access_point" => Self::AccessPoint,
            "firewall" => Self::Firewall,
            "voip" => Self::Voip,
            _ => Self::Unknown,
        }
    }
}

/// A discovered network device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Device {
    pub id: String,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub ipv4: String,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub vendor: Option<String>,
    pub device_type: String,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub os_family: Option<String>,
    pub os_confidence: Option<f64>,
    pub status: String,
    pub network_id: String,
    pub created_at: String,
    pub updated_at: String,
    pub last_seen_online_at: Option<String>,
    pub port_scan_started_at: Option<String>,
    pub port_scan_ended_at: Option<String>,
    pub web_scan_ended_at: Option<String>,
}

impl Device {
    /// Create a newly-sighted device, online as of now.
    pub fn new(ipv4: String, network_id: String) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            name: None,
            comment: None,
            ipv4,
            mac: None,
            hostname: None,
            vendor: None,
            device_type: DeviceType::Unknown.as_str().to_string(),
            os_name: None,
            os_version: None,
            os_family: None,
            os_confidence: None,
            status: DeviceStatus::Online.as_str().to_string(),
            network_id,
            created_at: now.clone(),
            updated_at: now.clone(),
            last_seen_online_at: Some(now),
            port_scan_started_at: None,
            port_scan_ended_at: None,
            web_scan_ended_at: None,
        }
    }

    pub fn device_type_enum(&self) -> DeviceType {
        DeviceType::from_str_lossy(&self.device_type)
    }

    pub fn status_enum(&self) -> DeviceStatus {
        DeviceStatus::from_str_lossy(&self.status)
    }
}

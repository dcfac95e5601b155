//! EventLog model: an append-only timeline entry, never mutated after insert.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Closed set of event kinds the core can emit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PingSweep,
    PortScanStarted,
    PortScanCompleted,
    DeviceOnline,
    DeviceIdle,
    DeviceOffline,
    DeviceDeleted,
    LocalIpFound,
    LocalNetworkFound,
    NetworkCreated,
    NetworkUpdated,
    NetworkDeleted,
    ScanStarted,
    ScanStopped,
    NewNetworkDetected,
    Warning,
    Alert,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PingSweep => "PingSweep",
            Self::PortScanStarted => "PortScanStarted",
            Self::PortScanCompleted => "PortScanCompleted",
            Self::DeviceOnline => "DeviceOnline",
            Self::DeviceIdle => "DeviceIdle",
            Self::DeviceOffline => "DeviceOffline",
            Self::DeviceDeleted => "DeviceDeleted",
            Self::LocalIpFound => "LocalIPFound",
            Self::LocalNetworkFound => "LocalNetworkFound",
            Self::NetworkCreated => "NetworkCreated",
            Self::NetworkUpdated => "NetworkUpdated",
            Self::NetworkDeleted => "NetworkDeleted",
            Self::ScanStarted => "ScanStarted",
            Self::ScanStopped => "ScanStopped",
            Self::NewNetworkDetected => "NewNetworkDetected",
            Self::Warning => "Warning",
            Self::Alert => "Alert",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "PingSweep" => Self::PingSweep,
            "PortScanStarted" => Self::PortScanStarted,
            "PortScanCompleted" => Self::PortScanCompleted,
            "DeviceOnline" => Self::DeviceOnline,
            "DeviceIdle" => Self::DeviceIdle,
            "DeviceOffline" => Self::DeviceOffline,
            "DeviceDeleted" => Self::DeviceDeleted,
            "LocalIPFound" => Self::LocalIpFound,
            "LocalNetworkFound" => Self::LocalNetworkFound,
            "NetworkCreated" => Self::NetworkCreated,
            "NetworkUpdated" => Self::NetworkUpdated,
            "NetworkDeleted" => Self::NetworkDeleted,
            "ScanStarted" => Self::ScanStarted,
            "ScanStopped" => Self::ScanStopped,
            "NewNetworkDetected" => Self::NewNetworkDetected,
            "Alert" => Self::Alert,
            _ => Self::Warning,
        }
    }
}

/// An append-only timeline entry. Never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EventLog {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub event_type: String,
    pub description: String,
    pub device_id: Option<String>,
    pub duration_seconds: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl EventLog {
    /// Build a new entry ready for insert. `id` is filled in by the store
    /// (auto-increment primary key); a zero placeholder is used here.
    pub fn new(event_type: EventType, description: String, device_id: Option<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: 0,
            event_type: event_type.as_str().to_string(),
            description,
            device_id,
            duration_seconds: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_duration(mut self, seconds: i64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn event_type_enum(&self) -> EventType {
        EventType::from_str_lossy(&self.event_type)
    }
}

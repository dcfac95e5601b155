//! Network (target subnet) model types.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};

/// Lifecycle status of a tracked subnet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Active,
    Inactive,
    Scanning,
}

impl NetworkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Scanning => "scanning",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "scanning" => Self::Scanning,
            "inactive" => Self::Inactive,
            _ => Self::Active,
        }
    }
}

/// A target IPv4 subnet to discover and scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Network {
    pub id: String,
    pub name: String,
    pub cidr: String,
    pub description: Option<String>,
    pub status: String,
    pub last_scanned_at: Option<String>,
    pub device_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Network {
    /// Create a new network. Validates that `cidr` parses as an IPv4 CIDR.
    pub fn new(name: String, cidr: String) -> Result<Self> {
        validate_cidr(&cidr)?;
        let now = Utc::now().to_rfc3339();
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            cidr,
            description: None,
            status: NetworkStatus::Active.as_str().to_string(),
            last_scanned_at: None,
            device_count: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn status_enum(&self) -> NetworkStatus {
        NetworkStatus::from_str_lossy(&self.status)
    }
}

/// Validate that `cidr` is a well-formed IPv4 CIDR literal.
pub fn validate_cidr(cidr: &str) -> Result<ipnetwork::Ipv4Network> {
    cidr.parse::<ipnetwork::Ipv4Network>()
        .map_err(|e| CoreError::Validation(format!("invalid CIDR '{cidr}': {e}")))
}

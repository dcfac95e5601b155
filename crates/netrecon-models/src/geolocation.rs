//! GeolocationCache: keyed by IP literal, with a source-dependent expiry.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

/// Where a cached geolocation record came from, which determines its TTL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeoSource {
    Api,
    Fallback,
    Manual,
}

impl GeoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Fallback => "fallback",
            Self::Manual => "manual",
        }
    }

    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "fallback" => Self::Fallback,
            "manual" => Self::Manual,
            _ => Self::Api,
        }
    }

    /// TTL for a record from this source: 7 days for `api`, 30 for
    /// `fallback`; manual entries never expire (represented as 36500 days).
    pub fn ttl_days(&self) -> i64 {
        match self {
            Self::Api => 7,
            Self::Fallback => 30,
            Self::Manual => 36500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GeolocationCache {
    pub id: String,
    pub ip: String,
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub isp: Option<String>,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
    pub expires_at: String,
}

impl GeolocationCache {
    pub fn new(ip: String, source: GeoSource) -> Self {
        let now = Utc::now();
        let expires_at = now + Duration::days(source.ttl_days());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ip,
            city: None,
            region: None,
            country: None,
            country_code: None,
            latitude: None,
            longitude: None,
            timezone: None,
            isp: None,
            source: source.as_str().to_string(),
            created_at: now.to_rfc3339(),
            updated_at: now.to_rfc3339(),
            expires_at: expires_at.to_rfc3339(),
        }
    }

    pub fn source_enum(&self) -> GeoSource {
        GeoSource::from_str_lossy(&self.source)
    }

    pub fn is_expired(&self) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.expires_at) {
            Ok(expires_at) => expires_at < Utc::now(),
            Err(_) => true,
        }
    }
}

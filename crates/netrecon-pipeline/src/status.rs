//! Status Machine (C6): ticks on its own interval and ages devices from
//! online to idle to offline based on elapsed time since last sighting.
//!
//! The SQL-atomic transition (`devices::update_device_statuses`) does the
//! actual state change; this module only diffs the before/after snapshot to
//! know which devices crossed a threshold this tick, so it can log the
//! matching `EventLog`s (§4.6 explicitly allows this instead of encoding the
//! diff in SQL, as long as the end state matches).

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use netrecon_db::repo::devices;
use netrecon_db::WriterQueue;
use netrecon_events::EventSink;
use netrecon_models::device::{Device, DeviceStatus};
use netrecon_models::error::{CoreError, Result};
use netrecon_models::event::EventType;
use sqlx::SqlitePool;

/// The offline threshold; the idle threshold is always half of it (§4.6,
/// §9's "Ambiguity — preserved" note).
#[derive(Debug, Clone, Copy)]
pub struct StatusThresholds {
    offline: Duration,
}

impl StatusThresholds {
    pub fn new(offline: Duration) -> Result<Self> {
        if offline.is_zero() {
            return Err(CoreError::Validation("offline timeout must be positive".into()));
        }
        Ok(Self { offline })
    }

    pub fn offline(&self) -> Duration {
        self.offline
    }

    pub fn idle(&self) -> Duration {
        self.offline / 2
    }
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            offline: Duration::from_secs(180),
        }
    }
}

/// Devices that crossed a threshold during one `tick`.
#[derive(Debug, Default)]
pub struct StatusTransitions {
    pub went_idle: Vec<Device>,
    pub went_offline: Vec<Device>,
}

/// Run one status-machine tick: age every device per `thresholds`, then emit
/// `DeviceIdle`/`DeviceOffline` for devices that newly crossed a threshold.
pub async fn tick(
    pool: &SqlitePool,
    writer: &WriterQueue,
    sink: &dyn EventSink,
    thresholds: &StatusThresholds,
) -> Result<StatusTransitions> {
    let before = devices::list_all(pool).await.map_err(|e| CoreError::Other(e.to_string()))?;
    let before_status: HashMap<String, DeviceStatus> =
        before.iter().map(|d| (d.id.clone(), d.status_enum())).collect();

    let now = Utc::now();
    let now_s = now.to_rfc3339();
    let idle_cutoff = (now - chrono_duration(thresholds.idle())).to_rfc3339();
    let offline_cutoff = (now - chrono_duration(thresholds.offline())).to_rfc3339();

    writer
        .exec_r(move |pool| {
            let now_s = now_s.clone();
            let idle_cutoff = idle_cutoff.clone();
            let offline_cutoff = offline_cutoff.clone();
            async move {
                devices::update_device_statuses(&pool, &now_s, &idle_cutoff, &offline_cutoff)
                    .await
                    .map_err(|e| CoreError::Other(e.to_string()))
            }
        })
        .await?;

    let after = devices::list_all(pool).await.map_err(|e| CoreError::Other(e.to_string()))?;

    let mut transitions = StatusTransitions::default();
    for device in after {
        let Some(prev) = before_status.get(&device.id) else {
            continue;
        };
        let current = device.status_enum();
        if *prev != DeviceStatus::Idle && current == DeviceStatus::Idle {
            transitions.went_idle.push(device);
        } else if *prev != DeviceStatus::Offline && current == DeviceStatus::Offline {
            transitions.went_offline.push(device);
        }
    }

    for device in &transitions.went_idle {
        sink.emit(EventType::DeviceIdle, format!("{} is idle", device.ipv4), Some(device.id.clone()))
            .await?;
    }
    for device in &transitions.went_offline {
        sink.emit(EventType::DeviceOffline, format!("{} is offline", device.ipv4), Some(device.id.clone()))
            .await?;
    }

    Ok(transitions)
}

fn chrono_duration(d: Duration) -> chrono::Duration {
    chrono::Duration::from_std(d).unwrap_or(chrono::Duration::zero())
}

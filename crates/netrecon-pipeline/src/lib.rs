//! Per-device reconciliation and aging: the Device Reconciler (C5, with its
//! duplicate-cleanup sweep) and the Status Machine (C6).
//!
//! Both operate the same way the teacher's alert `Pipeline` did — a small
//! struct wired to a pool, a Writer Queue, and an event sink, driven by a
//! ticker the caller owns (the Scan Manager in `netrecon-scan`).

pub mod reconcile;
pub mod status;

use std::sync::Arc;

use netrecon_db::WriterQueue;
use netrecon_events::SharedEventSink;
use netrecon_models::device::Device;
use netrecon_models::error::Result;
use netrecon_models::network::Network;
use netrecon_scanner::discovery::DiscoveredHost;
use sqlx::SqlitePool;

pub use status::{StatusThresholds, StatusTransitions};

/// Wires a pool, Writer Queue, and event sink together so callers don't have
/// to thread all three through every call site.
#[derive(Clone)]
pub struct ReconciliationPipeline {
    pool: SqlitePool,
    writer: WriterQueue,
    sink: SharedEventSink,
}

impl ReconciliationPipeline {
    pub fn new(pool: SqlitePool, writer: WriterQueue, sink: SharedEventSink) -> Self {
        Self { pool, writer, sink }
    }

    /// Reconcile one discovered host against `network` (§4.5).
    pub async fn reconcile(&self, network: &Network, host: &DiscoveredHost) -> Result<Option<Device>> {
        reconcile::reconcile(&self.pool, &self.writer, self.sink.as_ref(), network, host).await
    }

    /// Run the duplicate-cleanup sweep; returns how many rows were removed.
    pub async fn sweep_duplicates(&self) -> Result<usize> {
        reconcile::sweep_duplicates(&self.writer).await
    }

    /// Run one Status Machine tick (§4.6).
    pub async fn status_tick(&self, thresholds: &StatusThresholds) -> Result<StatusTransitions> {
        status::tick(&self.pool, &self.writer, self.sink.as_ref(), thresholds).await
    }
}

/// Wraps a concrete `EventSink` in the `Arc<dyn EventSink>` most callers use
/// to construct a `ReconciliationPipeline`.
pub fn shared_sink<S: netrecon_events::EventSink + 'static>(sink: S) -> SharedEventSink {
    Arc::new(sink)
}

//! Event sink: components emit `EventLog` rows through here instead of
//! writing to the store directly.
//!
//! The teacher's event layer was an in-memory `tokio::broadcast` bus with
//! filtered subscribers — fine for ephemeral pub/sub, wrong for a table that
//! is meant to be queried later. An `EventLog` here is a persisted,
//! append-only timeline row (§4.1), so this crate inverts the shape: one
//! trait with a single write direction, backed by the Writer Queue, with no
//! subscriber side at all. Anything that wants live event data reads
//! `event_logs` back out of the store.

use std::sync::Arc;

use async_trait::async_trait;
use netrecon_db::repo::event_logs;
use netrecon_db::WriterQueue;
use netrecon_models::error::Result;
use netrecon_models::event::{EventLog, EventType};

/// One-way emission surface. Implementors persist the event; they never
/// replay it back to the caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event_type: EventType, description: String, device_id: Option<String>) -> Result<()>;

    async fn emit_with_duration(
        &self,
        event_type: EventType,
        description: String,
        device_id: Option<String>,
        duration_seconds: i64,
    ) -> Result<()>;
}

/// Emits events by queuing an `event_logs` insert through the Writer Queue,
/// so event writes interleave correctly with every other store mutation
/// instead of racing it on a second connection.
#[derive(Clone)]
pub struct StoreEventSink {
    queue: WriterQueue,
}

impl StoreEventSink {
    pub fn new(queue: WriterQueue) -> Self {
        Self { queue }
    }
}

#[async_trait]
impl EventSink for StoreEventSink {
    async fn emit(&self, event_type: EventType, description: String, device_id: Option<String>) -> Result<()> {
        let event = EventLog::new(event_type, description, device_id);
        self.queue
            .exec(move |pool| {
                let event = event.clone();
                async move {
                    event_logs::create(&pool, &event)
                        .await
                        .map(|_| ())
                        .map_err(|e| netrecon_models::error::CoreError::Other(e.to_string()))
                }
            })
    }

    async fn emit_with_duration(
        &self,
        event_type: EventType,
        description: String,
        device_id: Option<String>,
        duration_seconds: i64,
    ) -> Result<()> {
        let event = EventLog::new(event_type, description, device_id).with_duration(duration_seconds);
        self.queue
            .exec(move |pool| {
                let event = event.clone();
                async move {
                    event_logs::create(&pool, &event)
                        .await
                        .map(|_| ())
                        .map_err(|e| netrecon_models::error::CoreError::Other(e.to_string()))
                }
            })
    }
}

/// A sink that discards everything it is given. Used by components under
/// test that don't care about the event trail.
#[derive(Clone, Default)]
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit(&self, _event_type: EventType, _description: String, _device_id: Option<String>) -> Result<()> {
        Ok(())
    }

    async fn emit_with_duration(
        &self,
        _event_type: EventType,
        _description: String,
        _device_id: Option<String>,
        _duration_seconds: i64,
    ) -> Result<()> {
        Ok(())
    }
}

/// Convenience alias for the trait-object form most components hold.
pub type SharedEventSink = Arc<dyn EventSink>;

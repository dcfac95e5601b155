//! Scan Manager: the state machine (C10) that owns a running scan pass,
//! plus the per-device enrichment pipeline (C7-C9) it drives.
//!
//! The teacher's cron/interval scheduler had no notion of per-device
//! causal ordering or cooperative in-flight drain on stop; this crate
//! keeps its `watch`-channel shutdown idiom (see `manager::spawn_pipeline`)
//! but replaces the job-table dispatch loop with the discovery -> reconcile
//! -> enrich pipeline described in the scan manager's state table.

pub mod manager;
pub mod worker;

pub use manager::{ScanManager, ScanManagerConfig, ScanManagerState};
pub use worker::{enrich_device, port_scan_eligible, WorkerConfig};

//! Scan Manager (C10): the `{stopped, running}` state machine plus the
//! concurrent pipeline that drives Host Discovery, the Device Reconciler,
//! and per-device enrichment while a scan is running.
//!
//! Cancellation is cooperative: a `watch` channel carries the stop signal
//! into a `tokio::select!` ticker loop, and `start_scan`/`stop_scan` own
//! the spawned task's handle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use netrecon_db::repo::networks;
use netrecon_db::WriterQueue;
use netrecon_events::SharedEventSink;
use netrecon_models::error::{CoreError, Result};
use netrecon_models::event::EventType;
use netrecon_models::network::Network;
use netrecon_pipeline::{ReconciliationPipeline, StatusThresholds};
use netrecon_scanner::oui::OuiTable;
use sqlx::SqlitePool;
use tokio::sync::{watch, Mutex, RwLock, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::worker::{self, WorkerConfig};

/// Tunables for one running scan pass (§6's configuration keys).
#[derive(Debug, Clone)]
pub struct ScanManagerConfig {
    pub discovery_interval: Duration,
    pub discovery_concurrency: usize,
    pub status_tick_interval: Duration,
    pub offline_timeout: Duration,
    pub port_scan_cooldown: Duration,
    pub screenshots_enabled: bool,
    pub fan_out: usize,
}

impl Default for ScanManagerConfig {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(60),
            discovery_concurrency: 50,
            status_tick_interval: Duration::from_secs(10),
            offline_timeout: Duration::from_secs(180),
            port_scan_cooldown: Duration::from_secs(30),
            screenshots_enabled: false,
            fan_out: 10,
        }
    }
}

/// Snapshot of the Scan Manager's state (§4.10).
#[derive(Debug, Clone, Default)]
pub struct ScanManagerState {
    pub running: bool,
    pub selected_network_id: Option<String>,
    pub current_network_id: Option<String>,
    pub started_at: Option<String>,
    pub last_pass_at: Option<String>,
}

/// Owns the running/stopped state machine and, while running, the
/// discovery+enrichment pipeline task.
#[derive(Clone)]
pub struct ScanManager {
    pool: SqlitePool,
    writer: WriterQueue,
    sink: SharedEventSink,
    oui_table: OuiTable,
    config: ScanManagerConfig,
    state: Arc<RwLock<ScanManagerState>>,
    cancel_tx: Arc<Mutex<Option<watch::Sender<bool>>>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScanManager {
    pub fn new(pool: SqlitePool, writer: WriterQueue, sink: SharedEventSink, oui_table: OuiTable, config: ScanManagerConfig) -> Self {
        Self {
            pool,
            writer,
            sink,
            oui_table,
            config,
            state: Arc::new(RwLock::new(ScanManagerState::default())),
            cancel_tx: Arc::new(Mutex::new(None)),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn state(&self) -> ScanManagerState {
        self.state.read().await.clone()
    }

    /// `stopped -> StartScan(id) -> running`. Rejects with `Conflict` if
    /// already running; `NotFound` if `network_id` doesn't exist.
    pub async fn start_scan(&self, network_id: &str) -> Result<()> {
        {
            let state = self.state.read().await;
            if state.running {
                return Err(CoreError::Conflict("scan already running".into()));
            }
        }

        let network = networks::find_by_id(&self.pool, network_id).await?;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        *self.cancel_tx.lock().await = Some(cancel_tx);

        {
            let mut state = self.state.write().await;
            state.running = true;
            state.current_network_id = Some(network.id.clone());
            state.started_at = Some(Utc::now().to_rfc3339());
        }

        let handle = spawn_pipeline(
            self.pool.clone(),
            self.writer.clone(),
            self.sink.clone(),
            self.oui_table.clone(),
            network,
            self.config.clone(),
            cancel_rx,
            self.state.clone(),
        );
        *self.task.lock().await = Some(handle);

        self.sink.emit(EventType::ScanStarted, "scan started".into(), None).await?;
        Ok(())
    }

    /// `running -> StopScan() -> stopped`. A no-op when already stopped —
    /// the transition table only defines the running case.
    pub async fn stop_scan(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if !state.running {
                return Ok(());
            }
            state.running = false;
        }

        if let Some(tx) = self.cancel_tx.lock().await.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }

        self.sink.emit(EventType::ScanStopped, "scan stopped".into(), None).await?;
        Ok(())
    }

    /// Validates `network_id` and updates `selected_network_id` only; does
    /// not start a scan (§4.10's "any -> SetSelectedNetwork" row).
    pub async fn set_selected_network(&self, network_id: &str) -> Result<()> {
        let network = networks::find_by_id(&self.pool, network_id).await?;
        self.state.write().await.selected_network_id = Some(network.id);
        Ok(())
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_pipeline(
    pool: SqlitePool,
    writer: WriterQueue,
    sink: SharedEventSink,
    oui_table: OuiTable,
    network: Network,
    config: ScanManagerConfig,
    mut cancel_rx: watch::Receiver<bool>,
    state: Arc<RwLock<ScanManagerState>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reconciliation = ReconciliationPipeline::new(pool.clone(), writer.clone(), sink.clone());
        let Ok(status_thresholds) = StatusThresholds::new(config.offline_timeout) else {
            tracing::error!("invalid offline_timeout, status machine disabled for this pass");
            return;
        };
        let scanner_binary = netrecon_scanner::port_scan::find_scanner_binary();
        if scanner_binary.is_none() {
            tracing::warn!("no port scanner binary found, port/web/os enrichment disabled this pass");
        }
        let worker_config = WorkerConfig {
            port_scan_cooldown: config.port_scan_cooldown,
            screenshots_enabled: config.screenshots_enabled,
        };

        let mut discovery_ticker = tokio::time::interval(config.discovery_interval);
        discovery_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut status_ticker = tokio::time::interval(config.status_tick_interval);
        status_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = cancel_rx.changed() => {
                    if changed.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
                _ = status_ticker.tick() => {
                    if let Err(e) = reconciliation.status_tick(&status_thresholds).await {
                        tracing::warn!(error = %e, "status tick failed");
                    }
                }
                _ = discovery_ticker.tick() => {
                    run_discovery_pass(
                        &network,
                        &config,
                        &oui_table,
                        &reconciliation,
                        &pool,
                        &writer,
                        &sink,
                        scanner_binary.as_ref(),
                        &worker_config,
                        &mut cancel_rx,
                    )
                    .await;
                    state.write().await.last_pass_at = Some(Utc::now().to_rfc3339());
                }
            }
        }
    })
}

#[allow(clippy::too_many_arguments)]
async fn run_discovery_pass(
    network: &Network,
    config: &ScanManagerConfig,
    oui_table: &OuiTable,
    reconciliation: &ReconciliationPipeline,
    pool: &SqlitePool,
    writer: &WriterQueue,
    sink: &SharedEventSink,
    scanner_binary: Option<&PathBuf>,
    worker_config: &WorkerConfig,
    cancel_rx: &mut watch::Receiver<bool>,
) {
    let Ok(cidr) = network.cidr.parse::<ipnetwork::Ipv4Network>() else {
        tracing::error!(cidr = %network.cidr, "network has an invalid CIDR, skipping discovery pass");
        return;
    };
    let hosts = netrecon_scanner::discovery::sweep(cidr, config.discovery_concurrency, oui_table).await;

    let semaphore = Arc::new(Semaphore::new(config.fan_out.max(1)));
    let mut set = JoinSet::new();
    for host in hosts {
        if *cancel_rx.borrow() {
            break;
        }
        let semaphore = semaphore.clone();
        let pool = pool.clone();
        let writer = writer.clone();
        let sink = sink.clone();
        let network = network.clone();
        let scanner_binary = scanner_binary.cloned();
        let worker_config = worker_config.clone();
        let reconciliation = reconciliation.clone();
        set.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let device = match reconciliation.reconcile(&network, &host).await {
                Ok(Some(device)) => device,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "reconcile failed");
                    return;
                }
            };
            if let Err(e) = worker::enrich_device(&pool, &writer, sink.as_ref(), scanner_binary.as_ref(), device, &worker_config).await {
                tracing::warn!(error = %e, "device enrichment failed");
            }
        });
    }
    while set.join_next().await.is_some() {}

    if let Err(e) = reconciliation.sweep_duplicates().await {
        tracing::warn!(error = %e, "duplicate sweep failed");
    }
}

//! Single-writer serialization in front of the store.
//!
//! One long-lived task drains two unbounded FIFO channels — `exec` (no
//! return value) and `exec_r` (returns a value or error to the caller via a
//! oneshot reply). Ordering is FIFO within each channel; across the two
//! channels any interleaving is permitted, matching the "DB manager
//! goroutine" shape this is modeled on: do not share a connection, share a
//! queue.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use netrecon_models::error::{CoreError, Result};
use sqlx::SqlitePool;
use tokio::sync::{mpsc, oneshot};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Exponential backoff schedule applied to recoverable "store busy" errors.
const BACKOFF: &[Duration] = &[
    Duration::from_millis(100),
    Duration::from_millis(200),
    Duration::from_millis(400),
];

/// Single-writer queue. Cloning shares the same underlying worker.
#[derive(Clone)]
pub struct WriterQueue {
    pool: SqlitePool,
    exec_tx: mpsc::UnboundedSender<BoxFuture>,
    execr_tx: mpsc::UnboundedSender<BoxFuture>,
    stopped: Arc<AtomicBool>,
}

impl WriterQueue {
    /// Spawn the worker task and return a handle to submit work to it.
    pub fn spawn(pool: SqlitePool) -> Self {
        let (exec_tx, mut exec_rx) = mpsc::unbounded_channel::<BoxFuture>();
        let (execr_tx, mut execr_rx) = mpsc::unbounded_channel::<BoxFuture>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    job = execr_rx.recv() => {
                        match job {
                            Some(fut) => fut.await,
                            None => break,
                        }
                    }
                    job = exec_rx.recv() => {
                        match job {
                            Some(fut) => fut.await,
                            None => break,
                        }
                    }
                    else => break,
                }
            }
        });

        Self {
            pool,
            exec_tx,
            execr_tx,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Submit a fire-and-forget write. Retried with exponential backoff if
    /// the closure reports `CoreError::Busy`.
    pub fn exec<F, Fut>(&self, f: F) -> Result<()>
    where
        F: Fn(SqlitePool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoreError::Other("writer queue stopped".into()));
        }
        let pool = self.pool.clone();
        let fut: BoxFuture = Box::pin(async move {
            if let Err(e) = retry_with_backoff(|| f(pool.clone())).await {
                tracing::warn!(error = %e, "writer queue exec failed after retries");
            }
        });
        self.exec_tx
            .send(fut)
            .map_err(|_| CoreError::Other("writer queue worker gone".into()))
    }

    /// Submit a write and block until its result is ready. Retried with
    /// exponential backoff on `CoreError::Busy`.
    pub async fn exec_r<T, F, Fut>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: Fn(SqlitePool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(CoreError::Other("writer queue stopped".into()));
        }
        let pool = self.pool.clone();
        let (reply_tx, reply_rx) = oneshot::channel::<Result<T>>();
        let fut: BoxFuture = Box::pin(async move {
            let result = retry_with_backoff(|| f(pool.clone())).await;
            let _ = reply_tx.send(result);
        });
        self.execr_tx
            .send(fut)
            .map_err(|_| CoreError::Other("writer queue worker gone".into()))?;
        reply_rx
            .await
            .map_err(|_| CoreError::Other("writer queue dropped reply".into()))?
    }

    /// Mark the queue stopped. In-flight and already-queued work still
    /// drains; submissions after this point are refused.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Retry `f` up to `BACKOFF.len() + 1` total attempts, sleeping the matching
/// backoff duration between attempts, stopping early on any non-`Busy`
/// error.
async fn retry_with_backoff<T, F, Fut>(f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for delay in std::iter::once(None).chain(BACKOFF.iter().map(|d| Some(*d))) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match f().await {
            Ok(v) => return Ok(v),
            Err(CoreError::Busy(msg)) => last_err = Some(CoreError::Busy(msg)),
            Err(other) => return Err(other),
        }
    }
    Err(last_err.unwrap_or_else(|| CoreError::Busy("exhausted retries".into())))
}

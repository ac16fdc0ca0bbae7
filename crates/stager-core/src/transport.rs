//! Transport seam: asynchronous byte transfer with a lifecycle event stream.

mod curl;

pub use self::curl::CurlTransport;

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Lifecycle event reported by a transport while a transfer runs.
#[derive(Debug, Clone)]
pub enum TransferEvent {
    Started,
    Progress {
        /// Fraction in [0.0, 1.0].
        percent: f64,
        transferred_bytes: u64,
        total_bytes: u64,
    },
    /// Transfer finished; `path` is where the artifact landed (may differ
    /// from the requested destination, e.g. a derived filename inside it).
    Completed { path: PathBuf },
    Cancelled,
}

/// Performs the byte transfer for one job.
///
/// Contract: send `Started`, zero or more `Progress`, then exactly one of
/// `Completed`/`Cancelled` before returning `Ok(())`. A failed transfer
/// returns `Err` instead of sending a terminal event. Implementations should
/// watch `abort` and report `Cancelled` once it is set.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn transfer(
        &self,
        source: &str,
        destination: &Path,
        abort: Arc<AtomicBool>,
        events: mpsc::Sender<TransferEvent>,
    ) -> Result<()>;
}

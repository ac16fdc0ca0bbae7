//! Single-stream curl GET transport.
//!
//! Downloads the source into a `.part` staging file, relays libcurl progress
//! into the lifecycle channel, and renames to the final artifact path on
//! success. Honors the abort token via the progress callback.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use curl::easy::Easy;
use tokio::sync::mpsc;

use super::{TransferEvent, Transport};

/// Transport backed by a blocking curl `Easy` handle driven in
/// `spawn_blocking`. Suitable for HTTP/HTTPS sources.
#[derive(Debug, Default)]
pub struct CurlTransport;

impl CurlTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for CurlTransport {
    async fn transfer(
        &self,
        source: &str,
        destination: &Path,
        abort: Arc<AtomicBool>,
        events: mpsc::Sender<TransferEvent>,
    ) -> Result<()> {
        let target = artifact_path(source, destination);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create artifact dir: {}", parent.display()))?;
        }
        let part = part_path(&target);

        events.send(TransferEvent::Started).await.ok();

        let outcome = {
            let source = source.to_string();
            let part = part.clone();
            let events = events.clone();
            let abort = Arc::clone(&abort);
            tokio::task::spawn_blocking(move || perform_get(&source, &part, &abort, &events))
                .await
                .context("transfer task join")?
        };

        match outcome {
            Ok(GetOutcome::Done) => {
                tokio::fs::rename(&part, &target)
                    .await
                    .with_context(|| format!("finalize artifact: {}", target.display()))?;
                events
                    .send(TransferEvent::Completed { path: target })
                    .await
                    .ok();
                Ok(())
            }
            Ok(GetOutcome::Aborted) => {
                let _ = tokio::fs::remove_file(&part).await;
                events.send(TransferEvent::Cancelled).await.ok();
                Ok(())
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&part).await;
                Err(e)
            }
        }
    }
}

enum GetOutcome {
    Done,
    Aborted,
}

fn perform_get(
    url: &str,
    part: &Path,
    abort: &AtomicBool,
    events: &mpsc::Sender<TransferEvent>,
) -> Result<GetOutcome> {
    let mut file = std::fs::File::create(part)
        .with_context(|| format!("create staging file: {}", part.display()))?;

    let mut easy = Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(Duration::from_secs(30))?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.progress(true)?;

    let aborted = {
        let mut transfer = easy.transfer();
        transfer.progress_function(|total, now, _, _| {
            if abort.load(Ordering::Relaxed) {
                return false;
            }
            if total > 0.0 {
                let percent = (now / total).clamp(0.0, 1.0);
                // Dropping a tick when the channel is full is acceptable.
                let _ = events.try_send(TransferEvent::Progress {
                    percent,
                    transferred_bytes: now as u64,
                    total_bytes: total as u64,
                });
            }
            true
        })?;
        transfer.write_function(|data| {
            use std::io::Write;
            match file.write_all(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    tracing::warn!("staging write failed: {}", e);
                    Ok(0) // aborts the transfer
                }
            }
        })?;
        match transfer.perform() {
            Ok(()) => false,
            Err(e) if e.is_aborted_by_callback() => true,
            Err(e) => return Err(e).context("GET request failed"),
        }
    };
    if aborted {
        return Ok(GetOutcome::Aborted);
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        anyhow::bail!("GET {} returned HTTP {}", url, code);
    }
    file.sync_all().context("sync staging file")?;
    Ok(GetOutcome::Done)
}

/// Where the artifact lands: inside `destination` under a filename derived
/// from the source when the destination is a directory, else `destination`
/// itself.
fn artifact_path(source: &str, destination: &Path) -> PathBuf {
    if destination.is_dir() {
        destination.join(filename_from_source(source))
    } else {
        destination.to_path_buf()
    }
}

fn part_path(target: &Path) -> PathBuf {
    PathBuf::from(format!("{}.part", target.display()))
}

/// Last non-empty path segment of the source URL, or a generic fallback.
fn filename_from_source(source: &str) -> String {
    url::Url::parse(source)
        .ok()
        .and_then(|parsed| {
            parsed
                .path()
                .split('/')
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_string)
        })
        .filter(|s| s.as_str() != "." && s.as_str() != "..")
        .unwrap_or_else(|| "download.bin".to_string())
}

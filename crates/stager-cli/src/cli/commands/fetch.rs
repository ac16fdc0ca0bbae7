//! `stager fetch` – enqueue sources and run them to completion.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast::{self, error::RecvError};

use stager_core::config::StagerConfig;
use stager_core::events::JobEvent;
use stager_core::job::JobRequest;
use stager_core::scheduler::Scheduler;
use stager_core::transport::CurlTransport;
use stager_core::unpack::TarUnpacker;

const PROGRESS_INTERVAL_MS: u128 = 500;

pub async fn run_fetch(
    cfg: &StagerConfig,
    sources: &[String],
    dest: Option<PathBuf>,
    unpack: bool,
    jobs: Option<usize>,
) -> Result<()> {
    let dest_dir = match dest.or_else(|| cfg.stage_dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&dest_dir)
        .with_context(|| format!("create destination {}", dest_dir.display()))?;
    let ceiling = jobs.unwrap_or(cfg.max_concurrent_transfers);

    let scheduler = Scheduler::new(
        ceiling,
        &cfg.unpack_tool,
        Arc::new(CurlTransport::new()),
        Arc::new(TarUnpacker::new()),
    );
    let mut events = scheduler.subscribe();

    // The source URL doubles as the job id, so repeated URLs dedup naturally.
    let outstanding: HashSet<String> = sources.iter().cloned().collect();
    let total = outstanding.len();
    for source in sources {
        scheduler.enqueue(JobRequest {
            id: source.clone(),
            source: source.clone(),
            destination: dest_dir.clone(),
            label: source.clone(),
            unpack,
        });
    }
    tracing::info!(total, dest = %dest_dir.display(), "fetch started");

    let failures = drain_events(&mut events, outstanding, |id| scheduler.is_queued(id)).await;
    if failures > 0 {
        anyhow::bail!("{} of {} job(s) failed", failures, total);
    }
    Ok(())
}

/// Consumes lifecycle events until every outstanding job has reached a
/// terminal state, returning the number of failures seen. A lagged subscriber
/// may have skipped terminal events, so after a lag the outstanding set is
/// resynchronized against `still_tracked` instead of waiting forever.
async fn drain_events<F>(
    events: &mut broadcast::Receiver<JobEvent>,
    mut outstanding: HashSet<String>,
    still_tracked: F,
) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut failures = 0usize;
    let mut last_print = Instant::now();
    while !outstanding.is_empty() {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event subscriber lagged");
                outstanding.retain(|id| still_tracked(id));
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        match event {
            JobEvent::Started { id, .. } => println!("{id}: started"),
            JobEvent::Progress {
                id,
                percent,
                transferred_bytes,
                total_bytes,
            } => {
                let done = percent >= 1.0;
                if done || last_print.elapsed().as_millis() >= PROGRESS_INTERVAL_MS {
                    let done_mib = transferred_bytes as f64 / 1_048_576.0;
                    let total_mib = total_bytes as f64 / 1_048_576.0;
                    println!(
                        "{}: {:>5.1}% ({:.1} / {:.1} MiB)",
                        id,
                        percent * 100.0,
                        done_mib,
                        total_mib
                    );
                    last_print = Instant::now();
                }
            }
            JobEvent::Completed { id } => {
                outstanding.remove(&id);
                println!("{id}: completed");
            }
            JobEvent::Cancelled { id } => {
                outstanding.remove(&id);
                println!("{id}: cancelled");
            }
            JobEvent::Error { id, phase, message } => {
                outstanding.remove(&id);
                failures += 1;
                println!("{id}: {phase} error: {message}");
            }
        }
    }
    failures
}

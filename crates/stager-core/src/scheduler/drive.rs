//! Drives one admitted job: transfer phase, then the optional unpack phase.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::events::{JobEvent, JobPhase};
use crate::job::JobRecord;
use crate::transport::TransferEvent;

use super::Inner;

const TRANSFER_EVENT_BUFFER: usize = 32;

/// Runs the transport for `job`, relaying progress onto the event bus, then
/// the unpacker when requested. Failures never propagate: every outcome ends
/// in exactly one terminal event for this job, and the transfer slot is freed
/// (with a scheduling pass) before any terminal event or unpack work.
pub(super) async fn drive_job(inner: Arc<Inner>, job: JobRecord, abort: Arc<AtomicBool>) {
    // An unpack destination is a directory by contract. It must exist before
    // the transport decides where the archive lands inside it.
    if job.unpack {
        if let Err(e) = tokio::fs::create_dir_all(&job.destination).await {
            inner.release_slot(&job.id);
            inner.events.emit(JobEvent::Error {
                id: job.id,
                phase: JobPhase::Transfer,
                message: format!("create destination {}: {e}", job.destination.display()),
            });
            return;
        }
    }

    let (tx, mut rx) = mpsc::channel(TRANSFER_EVENT_BUFFER);
    let transfer = {
        let transport = Arc::clone(&inner.transport);
        let source = job.source.clone();
        let destination = job.destination.clone();
        tokio::spawn(async move { transport.transfer(&source, &destination, abort, tx).await })
    };

    let mut artifact = None;
    let mut cancelled = false;
    while let Some(event) = rx.recv().await {
        match event {
            TransferEvent::Started => {
                tracing::debug!(id = %job.id, "transport confirmed start");
            }
            TransferEvent::Progress {
                percent,
                transferred_bytes,
                total_bytes,
            } => {
                inner.events.emit(JobEvent::Progress {
                    id: job.id.clone(),
                    percent,
                    transferred_bytes,
                    total_bytes,
                });
            }
            TransferEvent::Completed { path } => artifact = Some(path),
            TransferEvent::Cancelled => cancelled = true,
        }
    }

    let result = match transfer.await {
        Ok(res) => res,
        Err(e) => Err(anyhow::anyhow!("transfer task join: {}", e)),
    };

    // Unpacking does not count against the ceiling, so the slot is freed
    // before any post-processing.
    inner.release_slot(&job.id);

    if cancelled {
        tracing::info!(id = %job.id, "transfer cancelled");
        inner.events.emit(JobEvent::Cancelled { id: job.id });
        return;
    }
    if let Err(e) = result {
        tracing::warn!(id = %job.id, error = %e, "transfer failed");
        inner.events.emit(JobEvent::Error {
            id: job.id,
            phase: JobPhase::Transfer,
            message: format!("{e:#}"),
        });
        return;
    }
    let Some(artifact) = artifact else {
        inner.events.emit(JobEvent::Error {
            id: job.id,
            phase: JobPhase::Transfer,
            message: "transport finished without reporting an artifact".into(),
        });
        return;
    };
    if !job.unpack {
        tracing::info!(id = %job.id, path = %artifact.display(), "job completed");
        inner.events.emit(JobEvent::Completed { id: job.id });
        return;
    }

    match inner
        .unpacker
        .unpack(&inner.unpack_tool, &artifact, &job.destination, true)
        .await
    {
        Ok(()) => {
            tracing::info!(id = %job.id, dest = %job.destination.display(), "job unpacked and completed");
            inner.events.emit(JobEvent::Completed { id: job.id });
        }
        Err(e) => {
            tracing::warn!(id = %job.id, error = %e, "unpack failed after successful transfer");
            inner.events.emit(JobEvent::Error {
                id: job.id,
                phase: JobPhase::Unpack,
                message: format!("{e:#}"),
            });
        }
    }
}

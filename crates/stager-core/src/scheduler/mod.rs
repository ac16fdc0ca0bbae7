//! Background job scheduler.
//!
//! Owns the in-memory queue of job records, enforces the concurrency ceiling,
//! drives each admitted job through the transport and (when requested) the
//! unpack collaborator, and emits lifecycle events. The scheduling pass runs
//! after every enqueue and after every slot-freeing transition, so a freed
//! slot is always backfilled with the oldest waiting job.

mod drive;
mod queue;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::broadcast;

use crate::control::JobControl;
use crate::events::{EventBus, JobEvent};
use crate::job::{JobRecord, JobRequest, JobState};
use crate::transport::Transport;
use crate::unpack::Unpacker;

use self::queue::JobQueue;

const EVENT_BUS_CAPACITY: usize = 256;

/// The job orchestrator. Explicitly constructed with its collaborators
/// injected; cheap to clone and share across callers.
///
/// All queue mutation is serialized behind a single mutex, which is what
/// upholds the concurrency-ceiling invariant under concurrent enqueues.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    max_concurrent: usize,
    unpack_tool: PathBuf,
    transport: Arc<dyn Transport>,
    unpacker: Arc<dyn Unpacker>,
    events: EventBus,
    control: JobControl,
    state: Mutex<SchedState>,
    seq: AtomicU64,
}

struct SchedState {
    queue: JobQueue,
    /// Jobs currently in the transferring phase. Never exceeds
    /// `max_concurrent`; unpacking jobs are not counted.
    active: usize,
}

impl Scheduler {
    /// Creates a scheduler with the given concurrency ceiling (clamped to at
    /// least 1) and injected collaborators. `unpack_tool` is handed to the
    /// unpacker for jobs that request extraction.
    pub fn new(
        max_concurrent: usize,
        unpack_tool: impl Into<PathBuf>,
        transport: Arc<dyn Transport>,
        unpacker: Arc<dyn Unpacker>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_concurrent: max_concurrent.max(1),
                unpack_tool: unpack_tool.into(),
                transport,
                unpacker,
                events: EventBus::new(EVENT_BUS_CAPACITY),
                control: JobControl::new(),
                state: Mutex::new(SchedState {
                    queue: JobQueue::default(),
                    active: 0,
                }),
                seq: AtomicU64::new(0),
            }),
        }
    }

    /// Subscribes to lifecycle events. Terminal jobs are not retained in the
    /// queue, so any history a caller wants must be captured here.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Adds a job and triggers a scheduling pass. A duplicate id is a silent
    /// no-op: the existing record, its position, and its state are left
    /// untouched. Never blocks; must be called from within a tokio runtime
    /// since admitted jobs are spawned as tasks.
    pub fn enqueue(&self, request: JobRequest) {
        let created_at = unix_millis();
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let record = JobRecord::new(request, created_at, seq);
        let id = record.id.clone();
        let source = record.source.clone();

        let mut state = self.inner.state.lock().unwrap();
        if !state.queue.insert(record) {
            tracing::debug!(id = %id, "duplicate enqueue ignored");
            return;
        }
        tracing::info!(id = %id, source = %source, "job enqueued");
        self.inner.schedule(&mut state);
    }

    /// Count of jobs currently tracked (waiting or transferring).
    pub fn queue_size(&self) -> usize {
        self.inner.state.lock().unwrap().queue.len()
    }

    /// Snapshot of current queue contents ordered by creation time.
    pub fn list_queue(&self) -> Vec<JobRecord> {
        self.inner.state.lock().unwrap().queue.snapshot()
    }

    /// Membership test by job id.
    pub fn is_queued(&self, id: &str) -> bool {
        self.inner.state.lock().unwrap().queue.contains(id)
    }

    /// Cancels a job. A waiting job is removed immediately and `Cancelled`
    /// emitted; a started job has its abort token set, and the transport
    /// reports the cancellation through its event stream. Returns false if
    /// the id is unknown or the job is already past its transfer phase.
    pub fn cancel(&self, id: &str) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        match state.queue.get(id).map(|job| job.state) {
            Some(JobState::Waiting) => {
                state.queue.remove(id);
                drop(state);
                tracing::info!(id = %id, "waiting job cancelled");
                self.inner.events.emit(JobEvent::Cancelled { id: id.to_string() });
                true
            }
            Some(JobState::Started) => self.inner.control.request_abort(id),
            _ => false,
        }
    }
}

impl Inner {
    /// The scheduling pass. Idempotent and re-entrant: with no capacity or no
    /// eligible job it is a no-op, so every lifecycle callback can simply run
    /// it again.
    fn schedule(self: &Arc<Self>, state: &mut SchedState) {
        while state.active < self.max_concurrent {
            let Some(id) = state.queue.pop_next_waiting() else {
                break;
            };
            let Some(job) = state.queue.get_mut(&id) else {
                continue;
            };
            job.state = JobState::Started;
            state.active += 1;
            let admitted = job.clone();
            let abort = self.control.register(&id);
            tracing::info!(id = %id, active = state.active, "transfer started");
            self.events.emit(JobEvent::Started {
                id: id.clone(),
                label: admitted.label.clone(),
            });
            tokio::spawn(drive::drive_job(Arc::clone(self), admitted, abort));
        }
    }

    /// Frees a transfer slot after the job's transfer phase ended for any
    /// reason, drops the record from the queue, and backfills the slot.
    fn release_slot(self: &Arc<Self>, id: &str) {
        self.control.unregister(id);
        let mut state = self.state.lock().unwrap();
        state.queue.remove(id);
        state.active = state.active.saturating_sub(1);
        self.schedule(&mut state);
    }
}

fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

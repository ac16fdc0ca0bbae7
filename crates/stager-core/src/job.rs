//! Job records tracked by the scheduler.

use std::path::PathBuf;

/// Job identifier, caller-supplied. Identity key for deduplication: a second
/// enqueue with the same id is silently ignored.
pub type JobId = String;

/// Lifecycle state of a job.
///
/// `Unpacking` is a transient sub-phase entered only after the transfer
/// completed for a job that requested extraction; by then the job has already
/// left the queue and freed its concurrency slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Waiting,
    Started,
    Unpacking,
    Completed,
    Error,
    Cancelled,
}

impl JobState {
    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Started => "started",
            JobState::Unpacking => "unpacking",
            JobState::Completed => "completed",
            JobState::Error => "error",
            JobState::Cancelled => "cancelled",
        }
    }

    /// True for states with no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Error | JobState::Cancelled
        )
    }
}

/// Request to enqueue one fetch-and-optionally-unpack task.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub id: JobId,
    /// Location to fetch from (interpreted by the transport).
    pub source: String,
    /// Local path to fetch into. For unpack jobs this is the extraction target.
    pub destination: PathBuf,
    /// Human-readable description carried through into event payloads.
    pub label: String,
    /// If true, a post-transfer extraction phase runs before the job is done.
    pub unpack: bool,
}

/// Full job record tracked in the queue. Mutated in place by the scheduler
/// and dropped from the queue once its slot-holding phase ends; history is
/// only observable through the event bus.
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: JobId,
    pub source: String,
    pub destination: PathBuf,
    pub label: String,
    /// Unix epoch milliseconds at enqueue; FIFO scheduling key.
    pub created_at: i64,
    pub unpack: bool,
    pub state: JobState,
    /// Enqueue sequence number; breaks `created_at` ties deterministically.
    pub(crate) seq: u64,
}

impl JobRecord {
    pub(crate) fn new(request: JobRequest, created_at: i64, seq: u64) -> Self {
        Self {
            id: request.id,
            source: request.source,
            destination: request.destination,
            label: request.label,
            created_at,
            unpack: request.unpack,
            state: JobState::Waiting,
            seq,
        }
    }
}

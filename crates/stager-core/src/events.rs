//! Lifecycle event bus: fire-and-forget broadcast to any number of subscribers.
//!
//! The scheduler publishes one event per state transition; subscribers (UI,
//! logging, tests) attach via [`EventBus::subscribe`]. No acknowledgement or
//! backpressure is modeled.

use tokio::sync::broadcast;

use crate::job::JobId;

/// Which pipeline phase produced a job error. An `Unpack` error means the
/// transfer itself succeeded and only post-processing failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    Transfer,
    Unpack,
}

impl std::fmt::Display for JobPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobPhase::Transfer => write!(f, "transfer"),
            JobPhase::Unpack => write!(f, "unpack"),
        }
    }
}

/// Event emitted on a job state transition.
#[derive(Debug, Clone)]
pub enum JobEvent {
    Started {
        id: JobId,
        label: String,
    },
    Progress {
        id: JobId,
        /// Fraction in [0.0, 1.0], relayed from the transport as-is.
        percent: f64,
        transferred_bytes: u64,
        total_bytes: u64,
    },
    Completed {
        id: JobId,
    },
    Cancelled {
        id: JobId,
    },
    Error {
        id: JobId,
        phase: JobPhase,
        message: String,
    },
}

impl JobEvent {
    /// Id of the job the event concerns.
    pub fn job_id(&self) -> &str {
        match self {
            JobEvent::Started { id, .. }
            | JobEvent::Progress { id, .. }
            | JobEvent::Completed { id }
            | JobEvent::Cancelled { id }
            | JobEvent::Error { id, .. } => id,
        }
    }
}

/// Broadcast wrapper around the event stream. Emitting never blocks and never
/// fails; events published while no subscriber is attached are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<JobEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: JobEvent) {
        // SendError just means nobody is listening right now.
        let _ = self.tx.send(event);
    }
}

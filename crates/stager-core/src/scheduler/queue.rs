//! In-memory job queue: O(1) membership by id plus FIFO ordering for waiting
//! jobs (min-heap keyed by creation time).

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::job::{JobId, JobRecord, JobState};

/// Ordering key for waiting jobs: oldest `created_at` first, enqueue sequence
/// number as the deterministic tie-breaker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct WaitKey {
    created_at: i64,
    seq: u64,
    id: JobId,
}

/// Queue of non-terminal jobs. Heap entries may be stale (job removed or
/// already started); they are skipped on pop instead of being rebuilt.
#[derive(Debug, Default)]
pub(crate) struct JobQueue {
    jobs: HashMap<JobId, JobRecord>,
    waiting: BinaryHeap<Reverse<WaitKey>>,
}

impl JobQueue {
    /// Inserts a job unless one with the same id is already tracked.
    /// Returns false on duplicates; the existing record is left untouched.
    pub fn insert(&mut self, record: JobRecord) -> bool {
        if self.jobs.contains_key(&record.id) {
            return false;
        }
        self.waiting.push(Reverse(WaitKey {
            created_at: record.created_at,
            seq: record.seq,
            id: record.id.clone(),
        }));
        self.jobs.insert(record.id.clone(), record);
        true
    }

    /// Pops the oldest job still in `Waiting` state, if any.
    pub fn pop_next_waiting(&mut self) -> Option<JobId> {
        while let Some(Reverse(key)) = self.waiting.pop() {
            match self.jobs.get(&key.id) {
                Some(job) if job.state == JobState::Waiting => return Some(key.id),
                _ => continue, // stale heap entry
            }
        }
        None
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut JobRecord> {
        self.jobs.get_mut(id)
    }

    pub fn remove(&mut self, id: &str) -> Option<JobRecord> {
        self.jobs.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.jobs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Snapshot of tracked jobs ordered by creation time (oldest first).
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.jobs.values().cloned().collect();
        jobs.sort_by_key(|j| (j.created_at, j.seq));
        jobs
    }
}

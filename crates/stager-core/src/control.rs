//! Abort tokens for in-flight transfers.
//!
//! Each started job is registered with an abort token. `Scheduler::cancel`
//! sets the token; the transport is expected to notice and report the
//! cancellation through its event stream.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::job::JobId;

/// Registry of job id -> abort token for jobs currently transferring.
#[derive(Default)]
pub struct JobControl {
    jobs: RwLock<HashMap<JobId, Arc<AtomicBool>>>,
}

impl JobControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a starting job; the returned token is handed to the transport.
    pub fn register(&self, id: &str) -> Arc<AtomicBool> {
        let token = Arc::new(AtomicBool::new(false));
        self.jobs
            .write()
            .unwrap()
            .insert(id.to_string(), Arc::clone(&token));
        token
    }

    /// Unregisters a job (call when its transfer finishes, success or failure).
    pub fn unregister(&self, id: &str) {
        self.jobs.write().unwrap().remove(id);
    }

    /// Requests abort for a job. Returns false if the job is not registered.
    pub fn request_abort(&self, id: &str) -> bool {
        match self.jobs.read().unwrap().get(id) {
            Some(token) => {
                token.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }
}

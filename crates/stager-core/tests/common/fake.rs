//! Scripted collaborator doubles for scheduler tests.
//!
//! `ScriptedTransport` holds each transfer open until the test issues a
//! directive, so tests control exactly when jobs make progress and finish.
//! `RecordingUnpacker` records every invocation and can be configured to fail.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use stager_core::transport::{TransferEvent, Transport};
use stager_core::unpack::Unpacker;

#[derive(Debug)]
pub enum Directive {
    Progress {
        percent: f64,
        transferred_bytes: u64,
        total_bytes: u64,
    },
    Complete(PathBuf),
    Cancel,
    Fail(String),
}

#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<TransportState>,
}

#[derive(Default)]
struct TransportState {
    directives: Mutex<HashMap<String, mpsc::UnboundedSender<Directive>>>,
    started: Mutex<Vec<String>>,
    notify: Notify,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources whose transfer has been invoked, in invocation order.
    pub fn started(&self) -> Vec<String> {
        self.state.started.lock().unwrap().clone()
    }

    pub fn started_count(&self) -> usize {
        self.state.started.lock().unwrap().len()
    }

    /// Number of transfers currently held open.
    pub fn in_flight(&self) -> usize {
        self.state.directives.lock().unwrap().len()
    }

    /// Waits until at least `count` transfers have been invoked. Admission is
    /// signalled on the event bus before the driver task runs the transport,
    /// so assertions about invocations must rendezvous here first.
    pub async fn wait_started(&self, count: usize) {
        loop {
            let notified = self.state.notify.notified();
            if self.state.started.lock().unwrap().len() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Waits until the transfer for `source` has been invoked and returns its
    /// directive channel.
    async fn sender(&self, source: &str) -> mpsc::UnboundedSender<Directive> {
        loop {
            let notified = self.state.notify.notified();
            if let Some(tx) = self.state.directives.lock().unwrap().get(source).cloned() {
                return tx;
            }
            notified.await;
        }
    }

    pub async fn progress(&self, source: &str, percent: f64, transferred: u64, total: u64) {
        self.sender(source)
            .await
            .send(Directive::Progress {
                percent,
                transferred_bytes: transferred,
                total_bytes: total,
            })
            .expect("transfer gone");
    }

    pub async fn complete(&self, source: &str, path: impl Into<PathBuf>) {
        self.sender(source)
            .await
            .send(Directive::Complete(path.into()))
            .expect("transfer gone");
    }

    pub async fn cancel(&self, source: &str) {
        self.sender(source)
            .await
            .send(Directive::Cancel)
            .expect("transfer gone");
    }

    pub async fn fail(&self, source: &str, message: &str) {
        self.sender(source)
            .await
            .send(Directive::Fail(message.to_string()))
            .expect("transfer gone");
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn transfer(
        &self,
        source: &str,
        _destination: &Path,
        abort: Arc<AtomicBool>,
        events: mpsc::Sender<TransferEvent>,
    ) -> Result<()> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.state
            .directives
            .lock()
            .unwrap()
            .insert(source.to_string(), tx);
        self.state.started.lock().unwrap().push(source.to_string());
        self.state.notify.notify_waiters();

        events.send(TransferEvent::Started).await.ok();

        let outcome = loop {
            tokio::select! {
                directive = rx.recv() => match directive {
                    Some(Directive::Progress { percent, transferred_bytes, total_bytes }) => {
                        events
                            .send(TransferEvent::Progress { percent, transferred_bytes, total_bytes })
                            .await
                            .ok();
                    }
                    Some(Directive::Complete(path)) => break Ok(Some(TransferEvent::Completed { path })),
                    Some(Directive::Cancel) => break Ok(Some(TransferEvent::Cancelled)),
                    Some(Directive::Fail(message)) => break Err(anyhow::anyhow!(message)),
                    None => break Ok(None),
                },
                _ = tokio::time::sleep(Duration::from_millis(5)) => {
                    if abort.load(Ordering::Relaxed) {
                        break Ok(Some(TransferEvent::Cancelled));
                    }
                }
            }
        };

        self.state.directives.lock().unwrap().remove(source);
        match outcome {
            Ok(Some(terminal)) => {
                events.send(terminal).await.ok();
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnpackCall {
    pub tool: PathBuf,
    pub archive: PathBuf,
    pub destination: PathBuf,
    pub strip_top_level: bool,
}

#[derive(Clone, Default)]
pub struct RecordingUnpacker {
    state: Arc<UnpackState>,
}

#[derive(Default)]
struct UnpackState {
    calls: Mutex<Vec<UnpackCall>>,
    fail_with: Option<String>,
}

impl RecordingUnpacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// An unpacker whose every invocation fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            state: Arc::new(UnpackState {
                calls: Mutex::new(Vec::new()),
                fail_with: Some(message.to_string()),
            }),
        }
    }

    pub fn calls(&self) -> Vec<UnpackCall> {
        self.state.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Unpacker for RecordingUnpacker {
    async fn unpack(
        &self,
        tool: &Path,
        archive: &Path,
        destination: &Path,
        strip_top_level: bool,
    ) -> Result<()> {
        self.state.calls.lock().unwrap().push(UnpackCall {
            tool: tool.to_path_buf(),
            archive: archive.to_path_buf(),
            destination: destination.to_path_buf(),
            strip_top_level,
        });
        match &self.state.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

//! Task submission interface.
//!
//! [`TaskSubmitter`] pushes a task and signals the dispatcher under one
//! admission lock, so every push is matched by exactly one signal and
//! concurrent submitters cannot interleave between the two.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use super::queue::TaskQueue;
use super::startup::StartupGate;
use crate::types::DecodeTask;

/// Longest a submitter waits for the dispatcher to come up.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Sending side of the dispatcher's signal channel. One `()` per queued task.
pub(crate) type SignalSender = mpsc::UnboundedSender<()>;

/// Slot the dispatcher publishes its signal sender into on startup.
pub(crate) type EntryPoint = Arc<OnceLock<SignalSender>>;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// The dispatcher has stopped.
    #[error("dispatcher is not running")]
    Closed,

    /// The dispatcher never published its entry point.
    #[error("dispatcher did not start within {0:?}")]
    StartupTimeout(Duration),
}

/// Handle for queueing decode tasks. Cheap to clone.
#[derive(Clone)]
pub struct TaskSubmitter {
    queue: Arc<TaskQueue>,
    entry: EntryPoint,
    startup: Arc<StartupGate>,
    admission: Arc<Mutex<()>>,
    startup_timeout: Duration,
}

impl TaskSubmitter {
    pub(crate) fn new(queue: Arc<TaskQueue>, entry: EntryPoint, startup: Arc<StartupGate>) -> Self {
        Self {
            queue,
            entry,
            startup,
            admission: Arc::new(Mutex::new(())),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Queues `task` and signals the dispatcher. Returns the queue depth.
    ///
    /// Blocks only while the dispatcher is still starting up.
    pub fn submit(&self, task: DecodeTask) -> Result<usize, SubmitError> {
        let _admission = self.admission.lock();

        let signal = self.entry_point()?;
        if signal.is_closed() {
            return Err(SubmitError::Closed);
        }

        let depth = self.queue.push(task);
        signal.send(()).map_err(|_| SubmitError::Closed)?;
        Ok(depth)
    }

    fn entry_point(&self) -> Result<&SignalSender, SubmitError> {
        if let Some(signal) = self.entry.get() {
            return Ok(signal);
        }
        if !self.startup.wait_timeout(self.startup_timeout) {
            return Err(SubmitError::StartupTimeout(self.startup_timeout));
        }
        self.entry.get().ok_or(SubmitError::Closed)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl std::fmt::Debug for TaskSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSubmitter")
            .field("pending", &self.queue.len())
            .field("started", &self.entry.get().is_some())
            .finish()
    }
}

//! Single-threaded task admission.
//!
//! The dispatcher runs on its own named OS thread, driving an async loop on
//! the host runtime's handle. A dedicated thread keeps admission independent
//! of whatever runtime flavour the host picked.
//!
//! ```text
//!             startup: create channel ─▶ publish sender ─▶ release StartupGate
//!
//!   signal ──▶ acquire gate permit ──▶ pop task (FIFO/LIFO) ──▶ WorkerPool
//!     ▲              │
//!     │         blocks while N tasks are in flight
//!  TaskSubmitter
//! ```
//!
//! One signal is consumed per queued task. The permit is taken before the
//! pop, so under LIFO the task admitted when capacity frees up is the newest
//! one at that moment.

use std::sync::Arc;
use std::thread;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::gate::ConcurrencyGate;
use super::queue::TaskQueue;
use super::startup::StartupGate;
use super::submitter::EntryPoint;
use super::telemetry::{TelemetryEvent, TelemetrySink};
use super::worker::{WorkItem, WorkSender};

/// Name of the dispatcher thread.
pub const DISPATCHER_THREAD_NAME: &str = "imageloader-dispatch";

pub(crate) struct Dispatcher {
    queue: Arc<TaskQueue>,
    gate: Arc<ConcurrencyGate>,
    workers: WorkSender,
    telemetry: Arc<dyn TelemetrySink>,
}

impl Dispatcher {
    pub(crate) fn new(
        queue: Arc<TaskQueue>,
        gate: Arc<ConcurrencyGate>,
        workers: WorkSender,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            queue,
            gate,
            workers,
            telemetry,
        }
    }

    /// Starts the dispatcher thread.
    ///
    /// The thread publishes its signal sender into `entry` and releases
    /// `startup` before it begins waiting for signals. The gate is released
    /// even if the loop later exits, so submitters never wait forever.
    pub(crate) fn spawn(
        self,
        runtime: Handle,
        entry: EntryPoint,
        startup: Arc<StartupGate>,
        shutdown: CancellationToken,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name(DISPATCHER_THREAD_NAME.to_string())
            .spawn(move || {
                let (signal_tx, signal_rx) = mpsc::unbounded_channel();
                if entry.set(signal_tx).is_err() {
                    warn!("Dispatcher entry point already published");
                }
                startup.release();

                runtime.block_on(self.run(signal_rx, shutdown));
            })
    }

    /// The admission loop. Returns on shutdown or when every submitter is gone.
    pub(crate) async fn run(
        self,
        mut signals: mpsc::UnboundedReceiver<()>,
        shutdown: CancellationToken,
    ) {
        info!(
            policy = %self.queue.policy(),
            capacity = self.gate.capacity(),
            "Dispatcher starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Dispatcher interrupted waiting for work");
                    break;
                }

                signal = signals.recv() => {
                    if signal.is_none() {
                        debug!("All submitters dropped");
                        break;
                    }
                }
            }

            let permit = tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    debug!("Dispatcher interrupted waiting for a permit");
                    break;
                }

                permit = self.gate.acquire() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!("Concurrency gate closed");
                        break;
                    }
                },
            };

            let Some(task) = self.queue.pop() else {
                warn!("Signal received with an empty task queue");
                continue;
            };

            self.telemetry.emit(TelemetryEvent::TaskAdmitted {
                key: task.key().clone(),
                queue_wait: task.enqueued_at().elapsed(),
                in_flight: self.gate.in_flight(),
            });

            if self.workers.send(WorkItem { task, permit }).is_err() {
                warn!("Worker pool closed, dispatcher exiting");
                break;
            }
        }

        let abandoned = self.queue.clear();
        if abandoned > 0 {
            self.telemetry
                .emit(TelemetryEvent::TasksAbandoned { count: abandoned });
        }
        info!(abandoned, "Dispatcher stopped");
    }
}

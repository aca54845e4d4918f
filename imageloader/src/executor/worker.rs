//! Fixed-size decode worker pool.
//!
//! N long-lived tokio tasks share one work channel. Each work item carries
//! the gate permit taken by the dispatcher; the permit is dropped when the
//! item is finished, whatever the outcome.
//!
//! Per item:
//!
//! ```text
//! read dimensions ─▶ sample factor ─▶ decode (blocking pool)
//!        ─▶ cache put (no-op if present) ─▶ deliver ─▶ release permit
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::gate::GatePermit;
use super::telemetry::{TelemetryEvent, TelemetrySink};
use crate::cache::ImageCache;
use crate::decode::{DecodeError, ImageDecoder};
use crate::delivery::ResultDelivery;
use crate::size_policy::resolve_sample_factor;
use crate::types::{DecodeTask, DecodedImage, ImageSize, RequestKey, ResultEnvelope};

/// An admitted task and the gate permit it holds.
#[derive(Debug)]
pub struct WorkItem {
    pub task: DecodeTask,
    pub permit: GatePermit,
}

pub(crate) type WorkSender = mpsc::UnboundedSender<WorkItem>;

/// Everything a worker needs to finish a task.
pub(crate) struct WorkerContext {
    pub decoder: Arc<dyn ImageDecoder>,
    pub cache: Arc<ImageCache>,
    pub delivery: ResultDelivery,
    pub telemetry: Arc<dyn TelemetrySink>,
}

/// Result of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    pub image: DecodedImage,
    pub sample_factor: u32,
}

/// Probes `source`, picks a sample factor for `target` and decodes.
pub fn decode_for_target(
    decoder: &dyn ImageDecoder,
    source: &RequestKey,
    target: ImageSize,
) -> Result<Decoded, DecodeError> {
    let dimensions = decoder.dimensions(source)?;
    let sample_factor = resolve_sample_factor(dimensions, target);
    let image = decoder.decode(source, sample_factor)?;
    Ok(Decoded {
        image,
        sample_factor,
    })
}

/// The running pool.
pub struct WorkerPool {
    sender: WorkSender,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers on `runtime`.
    pub(crate) fn spawn(
        size: usize,
        context: WorkerContext,
        runtime: &Handle,
        shutdown: CancellationToken,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(Mutex::new(receiver));
        let context = Arc::new(context);

        let handles = (0..size)
            .map(|worker_id| {
                runtime.spawn(worker_loop(
                    worker_id,
                    Arc::clone(&receiver),
                    Arc::clone(&context),
                    shutdown.clone(),
                ))
            })
            .collect();

        info!(workers = size, "Decode worker pool started");
        Self { sender, handles }
    }

    pub(crate) fn sender(&self) -> WorkSender {
        self.sender.clone()
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Number of workers still running.
    pub fn live_workers(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("live", &self.live_workers())
            .finish()
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem>>>,
    context: Arc<WorkerContext>,
    shutdown: CancellationToken,
) {
    loop {
        let item = {
            let mut receiver = receiver.lock().await;
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => None,

                item = receiver.recv() => item,
            }
        };

        let Some(item) = item else {
            break;
        };
        context.process(worker_id, item).await;
    }

    debug!(worker_id, "Decode worker stopped");
}

impl WorkerContext {
    async fn process(&self, worker_id: usize, item: WorkItem) {
        let WorkItem { task, permit } = item;
        let key = task.key().clone();
        let target = task.target_size();
        let decoder = Arc::clone(&self.decoder);
        let started = Instant::now();

        let result = {
            let key = key.clone();
            tokio::task::spawn_blocking(move || decode_for_target(decoder.as_ref(), &key, target))
                .await
        };

        let decoded = match result {
            Ok(Ok(decoded)) => decoded,
            Ok(Err(e)) => {
                self.fail(worker_id, &key, e);
                return;
            }
            Err(join_error) => {
                let e = if join_error.is_panic() {
                    DecodeError::Panicked(key.to_string())
                } else {
                    DecodeError::Io {
                        source_key: key.to_string(),
                        error: std::io::Error::other(join_error.to_string()),
                    }
                };
                self.fail(worker_id, &key, e);
                return;
            }
        };

        self.complete(worker_id, task, decoded, started.elapsed());
        drop(permit);
    }

    fn complete(&self, worker_id: usize, task: DecodeTask, decoded: Decoded, duration: Duration) {
        let key = task.key().clone();
        let size = decoded.image.size();
        let image = Arc::new(decoded.image);

        if !self.cache.put(key.clone(), Arc::clone(&image)) {
            debug!(key = %key, "Already cached by an earlier decode");
        }

        self.telemetry.emit(TelemetryEvent::DecodeCompleted {
            key: key.clone(),
            worker_id,
            sample_factor: decoded.sample_factor,
            size,
            duration,
        });

        self.delivery
            .deliver(ResultEnvelope::new(key, image), Arc::clone(task.slot()));
    }

    fn fail(&self, worker_id: usize, key: &RequestKey, error: DecodeError) {
        warn!(key = %key, worker_id, error = %error, "Decode task failed");
        self.telemetry.emit(TelemetryEvent::DecodeFailed {
            key: key.clone(),
            worker_id,
            error: error.to_string(),
        });
    }
}

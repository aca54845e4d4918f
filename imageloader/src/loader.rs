//! The loader engine.
//!
//! [`ImageLoader`] wires the cache, queue, gate, dispatcher, worker pool and
//! delivery together and exposes a single fire-and-forget entry point,
//! [`ImageLoader::request`]. Construct one per process (or per host
//! context) and share it by reference or `Arc`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use imageloader::{delivery, FileDecoder, FixedDeviceMetrics, ImageLoader, ImageSlot, LoaderConfig, SlotGeometry};
//!
//! let (context, mut queue) = delivery::channel();
//! let loader = ImageLoader::builder(LoaderConfig::default().with_worker_count(4))
//!     .decoder(FileDecoder::new())
//!     .delivery(context)
//!     .device_metrics(FixedDeviceMetrics::new(1080, 1920))
//!     .build()?;
//!
//! let slot = Arc::new(ImageSlot::new(SlotGeometry::rendered(300, 200)));
//! loader.request("/photos/cat.jpg", slot.clone())?;
//!
//! // On the thread that owns the slots:
//! queue.run_pending();
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::thread;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ImageCache;
use crate::config::LoaderConfig;
use crate::decode::{FileDecoder, ImageDecoder};
use crate::delivery::{self, DeliveryContext, ResultDelivery};
use crate::executor::{
    ConcurrencyGate, Dispatcher, StartupGate, SubmitError, TaskQueue, TaskSubmitter,
    TelemetryEvent, TelemetrySink, TracingTelemetrySink, WorkerContext, WorkerPool,
};
use crate::size_policy::{resolve_target_size, ResolutionError};
use crate::slot::{DeviceMetrics, DisplaySlot, FixedDeviceMetrics};
use crate::types::{DecodeTask, RequestKey, ResultEnvelope};

#[derive(Debug, Error)]
pub enum LoaderError {
    /// The slot's size could not be determined; nothing was queued.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("image loader has been shut down")]
    ShutDown,

    /// The dispatcher did not come up in time.
    #[error(transparent)]
    Submit(SubmitError),

    #[error("no tokio runtime available; build inside a runtime or pass a handle")]
    NoRuntime,

    #[error("failed to start dispatcher thread: {0}")]
    DispatcherSpawn(#[source] std::io::Error),

    #[error("invalid loader configuration: {0}")]
    InvalidConfig(String),
}

impl From<SubmitError> for LoaderError {
    fn from(e: SubmitError) -> Self {
        match e {
            SubmitError::Closed => LoaderError::ShutDown,
            other => LoaderError::Submit(other),
        }
    }
}

/// How a request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Served from the cache; delivery has been posted.
    CacheHit,
    /// A decode task was queued behind `queue_depth - 1` others.
    Queued { queue_depth: usize },
}

impl RequestOutcome {
    pub fn is_cache_hit(&self) -> bool {
        matches!(self, Self::CacheHit)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ImageLoader`].
///
/// Defaults: [`FileDecoder`], a serial delivery task on the loader's runtime
/// ([`delivery::spawn_serial`]), no screen metrics, tracing telemetry, and
/// the runtime the builder is called from.
pub struct ImageLoaderBuilder {
    config: LoaderConfig,
    decoder: Option<Arc<dyn ImageDecoder>>,
    delivery: Option<Arc<dyn DeliveryContext>>,
    metrics: Option<Arc<dyn DeviceMetrics>>,
    telemetry: Option<Arc<dyn TelemetrySink>>,
    runtime: Option<Handle>,
}

impl ImageLoaderBuilder {
    fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            decoder: None,
            delivery: None,
            metrics: None,
            telemetry: None,
            runtime: None,
        }
    }

    pub fn decoder(mut self, decoder: impl ImageDecoder) -> Self {
        self.decoder = Some(Arc::new(decoder));
        self
    }

    pub fn shared_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Context that slot updates run on. Every update must run on one
    /// thread or one task at a time.
    pub fn delivery(mut self, context: impl DeliveryContext + 'static) -> Self {
        self.delivery = Some(Arc::new(context));
        self
    }

    pub fn device_metrics(mut self, metrics: impl DeviceMetrics + 'static) -> Self {
        self.metrics = Some(Arc::new(metrics));
        self
    }

    pub fn telemetry(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Runtime to run workers and the dispatcher loop on.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Starts the worker pool and dispatcher.
    pub fn build(self) -> Result<ImageLoader, LoaderError> {
        self.config.validate()?;

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| LoaderError::NoRuntime)?,
        };
        let decoder = self
            .decoder
            .unwrap_or_else(|| Arc::new(FileDecoder::new()));
        let context = match self.delivery {
            Some(context) => context,
            None => Arc::new(delivery::spawn_serial(&runtime)),
        };
        let metrics = self
            .metrics
            .unwrap_or_else(|| Arc::new(FixedDeviceMetrics::unavailable()));
        let telemetry = self
            .telemetry
            .unwrap_or_else(|| Arc::new(TracingTelemetrySink));

        let cache = Arc::new(ImageCache::new(self.config.cache_budget_bytes));
        let queue = Arc::new(TaskQueue::new(self.config.queue_policy));
        let gate = Arc::new(ConcurrencyGate::new(self.config.worker_count));
        let delivery = ResultDelivery::new(context, Arc::clone(&telemetry));
        let shutdown = CancellationToken::new();

        let workers = WorkerPool::spawn(
            self.config.worker_count,
            WorkerContext {
                decoder,
                cache: Arc::clone(&cache),
                delivery: delivery.clone(),
                telemetry: Arc::clone(&telemetry),
            },
            &runtime,
            shutdown.clone(),
        );

        let entry = Arc::new(OnceLock::new());
        let startup = Arc::new(StartupGate::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&queue),
            Arc::clone(&gate),
            workers.sender(),
            Arc::clone(&telemetry),
        );
        let dispatcher_thread = match dispatcher.spawn(
            runtime,
            Arc::clone(&entry),
            Arc::clone(&startup),
            shutdown.clone(),
        ) {
            Ok(thread) => thread,
            Err(e) => {
                shutdown.cancel();
                return Err(LoaderError::DispatcherSpawn(e));
            }
        };

        let submitter = TaskSubmitter::new(Arc::clone(&queue), entry, startup);

        info!(config = %self.config.summary(), "Image loader started");

        Ok(ImageLoader {
            config: self.config,
            cache,
            queue,
            gate,
            submitter,
            delivery,
            metrics,
            telemetry,
            workers,
            dispatcher_thread,
            shutdown,
        })
    }
}

// =============================================================================
// Loader
// =============================================================================

/// Asynchronous image loader.
pub struct ImageLoader {
    config: LoaderConfig,
    cache: Arc<ImageCache>,
    queue: Arc<TaskQueue>,
    gate: Arc<ConcurrencyGate>,
    submitter: TaskSubmitter,
    delivery: ResultDelivery,
    metrics: Arc<dyn DeviceMetrics>,
    telemetry: Arc<dyn TelemetrySink>,
    workers: WorkerPool,
    dispatcher_thread: thread::JoinHandle<()>,
    shutdown: CancellationToken,
}

impl ImageLoader {
    pub fn builder(config: LoaderConfig) -> ImageLoaderBuilder {
        ImageLoaderBuilder::new(config)
    }

    /// Requests `key` for `slot`.
    ///
    /// Tags the slot with `key` before anything else, so an older request
    /// for the same slot can no longer deliver. A cache hit posts the image
    /// to the delivery context straight away; a miss queues a decode sized
    /// to the slot. Never waits on decoding.
    pub fn request(
        &self,
        key: impl Into<RequestKey>,
        slot: Arc<dyn DisplaySlot>,
    ) -> Result<RequestOutcome, LoaderError> {
        if self.shutdown.is_cancelled() {
            return Err(LoaderError::ShutDown);
        }

        let key = key.into();
        self.telemetry
            .emit(TelemetryEvent::RequestReceived { key: key.clone() });
        slot.set_tag(key.clone());

        let target = resolve_target_size(&slot.geometry(), self.metrics.as_ref())?;

        if let Some(image) = self.cache.get(&key) {
            self.telemetry
                .emit(TelemetryEvent::CacheHit { key: key.clone() });
            self.delivery.deliver(ResultEnvelope::new(key, image), slot);
            return Ok(RequestOutcome::CacheHit);
        }

        let queue_depth = self
            .submitter
            .submit(DecodeTask::new(key.clone(), slot, target))?;
        self.telemetry
            .emit(TelemetryEvent::TaskQueued { key, queue_depth });

        Ok(RequestOutcome::Queued { queue_depth })
    }

    /// Stops the dispatcher and workers. Queued tasks are dropped; decodes
    /// already running finish but new requests fail with
    /// [`LoaderError::ShutDown`]. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            debug!("Image loader shutting down");
            self.shutdown.cancel();
            self.gate.close();
        }
    }

    /// True until shutdown and while the dispatcher thread is alive.
    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.dispatcher_thread.is_finished()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<ImageCache> {
        &self.cache
    }

    /// Tasks queued but not yet admitted.
    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    /// Decodes admitted and not yet finished.
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Most decodes ever admitted at once.
    pub fn peak_in_flight(&self) -> usize {
        self.gate.peak_in_flight()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.size()
    }
}

impl Drop for ImageLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .field("cache", &self.cache)
            .field("gate", &self.gate)
            .field("pending", &self.queue.len())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::DecodeError;
    use crate::executor::QueuePolicy;
    use crate::slot::{ImageSlot, SlotGeometry};
    use crate::types::{DecodedImage, ImageSize};

    struct TinyDecoder;

    impl ImageDecoder for TinyDecoder {
        fn dimensions(&self, _source: &RequestKey) -> Result<ImageSize, DecodeError> {
            Ok(ImageSize::new(4, 4))
        }

        fn decode(&self, _source: &RequestKey, _factor: u32) -> Result<DecodedImage, DecodeError> {
            Ok(DecodedImage::solid(4, 4, [1, 2, 3, 4]))
        }
    }

    fn config() -> LoaderConfig {
        LoaderConfig::new(2, QueuePolicy::Lifo, 1 << 20)
    }

    #[test]
    fn test_build_without_runtime_fails() {
        let result = ImageLoader::builder(config()).build();
        assert!(matches!(result, Err(LoaderError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_workers() {
        let result = ImageLoader::builder(config().with_worker_count(0)).build();
        assert!(matches!(result, Err(LoaderError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_build_rejects_zero_cache_budget() {
        let result = ImageLoader::builder(config().with_cache_budget(0)).build();
        assert!(matches!(result, Err(LoaderError::InvalidConfig(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unresolvable_size_queues_nothing() {
        let loader = ImageLoader::builder(config())
            .decoder(TinyDecoder)
            .build()
            .unwrap();
        let slot = Arc::new(ImageSlot::default());

        let err = loader.request("a", slot.clone()).unwrap_err();

        assert!(matches!(err, LoaderError::Resolution(_)));
        assert_eq!(slot.tag(), Some(RequestKey::new("a")));
        assert_eq!(loader.pending_tasks(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_after_shutdown_fails() {
        let loader = ImageLoader::builder(config())
            .decoder(TinyDecoder)
            .build()
            .unwrap();
        assert!(loader.is_running());

        loader.shutdown();
        loader.shutdown();

        let slot = Arc::new(ImageSlot::new(SlotGeometry::rendered(4, 4)));
        assert!(matches!(
            loader.request("a", slot),
            Err(LoaderError::ShutDown)
        ));
        assert!(!loader.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_accessors() {
        let loader = ImageLoader::builder(config())
            .decoder(TinyDecoder)
            .device_metrics(FixedDeviceMetrics::new(100, 100))
            .build()
            .unwrap();

        assert_eq!(loader.config(), &config());
        assert_eq!(loader.worker_count(), 2);
        assert_eq!(loader.cache().max_size_bytes(), 1 << 20);
        assert_eq!(loader.in_flight(), 0);
        assert!(format!("{:?}", loader).contains("ImageLoader"));
    }

    #[test]
    fn test_submit_error_mapping() {
        assert!(matches!(
            LoaderError::from(SubmitError::Closed),
            LoaderError::ShutDown
        ));
        assert!(matches!(
            LoaderError::from(SubmitError::StartupTimeout(std::time::Duration::ZERO)),
            LoaderError::Submit(_)
        ));
    }
}

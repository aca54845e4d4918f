//! Result delivery to display slots.
//!
//! Slots belong to the host's delivery context (typically a UI thread) and
//! are only ever mutated there. Workers and the request path hand results to
//! [`ResultDelivery`], which posts a callback to the [`DeliveryContext`].
//! When the callback runs it compares the slot's tag with the result's key:
//! a match sets the image, a mismatch means the slot has since been pointed
//! at another request and the result is dropped.
//!
//! ```text
//!  worker / request path              delivery context
//!  ─────────────────────              ────────────────
//!  deliver(envelope, slot) ──post──▶  slot.tag() == key ?
//!                                        yes → slot.set_image(image)
//!                                        no  → discard
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::executor::{TelemetryEvent, TelemetrySink};
use crate::slot::DisplaySlot;
use crate::types::ResultEnvelope;

/// A unit of work to run on the delivery context.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Execution context that owns the display slots.
pub trait DeliveryContext: Send + Sync {
    /// Schedules `callback` to run on this context. Must not block.
    fn post(&self, callback: Callback);
}

/// Runs callbacks immediately on the posting thread.
///
/// Opt-in only. Callbacks then run on worker threads and on the requesting
/// thread concurrently, so a tag check and the `set_image` that follows are
/// not serialized against other deliveries to the same slot. A stale result
/// can overwrite a newer one. Use it only when each slot receives at most
/// one request.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDelivery;

impl DeliveryContext for InlineDelivery {
    fn post(&self, callback: Callback) {
        callback();
    }
}

/// Creates a channel-backed delivery context.
///
/// The [`ChannelDelivery`] half is given to the loader; the owning thread
/// drains the [`DeliveryQueue`] half.
pub fn channel() -> (ChannelDelivery, DeliveryQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelDelivery { tx }, DeliveryQueue { rx })
}

/// Creates a channel-backed context drained by a single task on `runtime`.
///
/// Callbacks run one at a time in posting order. The task ends once every
/// posting half has been dropped. This is the loader's default context.
pub fn spawn_serial(runtime: &Handle) -> ChannelDelivery {
    let (context, queue) = channel();
    runtime.spawn(queue.run(CancellationToken::new()));
    context
}

/// Posting half of a channel-backed delivery context.
#[derive(Clone)]
pub struct ChannelDelivery {
    tx: mpsc::UnboundedSender<Callback>,
}

impl DeliveryContext for ChannelDelivery {
    fn post(&self, callback: Callback) {
        if self.tx.send(callback).is_err() {
            debug!("Delivery queue closed, dropping callback");
        }
    }
}

impl fmt::Debug for ChannelDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelDelivery")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

/// Draining half of a channel-backed delivery context.
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Callback>,
}

impl DeliveryQueue {
    /// Runs every callback already queued without waiting. Returns the count.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Waits for the next callback and runs it.
    ///
    /// Returns `false` once every posting half has been dropped.
    pub async fn recv_and_run(&mut self) -> bool {
        match self.rx.recv().await {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Runs callbacks until cancelled or every posting half is dropped.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                more = self.recv_and_run() => {
                    if !more {
                        break;
                    }
                }
            }
        }
    }
}

impl fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryQueue").finish_non_exhaustive()
    }
}

// =============================================================================
// Result Delivery
// =============================================================================

/// What happened to a result once it reached its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Discarded,
}

/// Staleness-checked handoff of results to slots.
#[derive(Clone)]
pub struct ResultDelivery {
    context: Arc<dyn DeliveryContext>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl ResultDelivery {
    pub fn new(context: Arc<dyn DeliveryContext>, telemetry: Arc<dyn TelemetrySink>) -> Self {
        Self { context, telemetry }
    }

    /// Posts `envelope` to the delivery context for `slot`.
    pub fn deliver(&self, envelope: ResultEnvelope, slot: Arc<dyn DisplaySlot>) {
        let telemetry = Arc::clone(&self.telemetry);
        self.context.post(Box::new(move || {
            apply(envelope, slot.as_ref(), telemetry.as_ref());
        }));
    }
}

impl fmt::Debug for ResultDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultDelivery").finish_non_exhaustive()
    }
}

/// Applies a result to a slot. Runs on the delivery context.
pub fn apply(
    envelope: ResultEnvelope,
    slot: &dyn DisplaySlot,
    telemetry: &dyn TelemetrySink,
) -> DeliveryOutcome {
    let current = slot.tag();
    if current.as_ref() == Some(&envelope.key) {
        slot.set_image(envelope.image);
        telemetry.emit(TelemetryEvent::Delivered { key: envelope.key });
        DeliveryOutcome::Delivered
    } else {
        telemetry.emit(TelemetryEvent::Discarded {
            key: envelope.key,
            current,
        });
        DeliveryOutcome::Discarded
    }
}

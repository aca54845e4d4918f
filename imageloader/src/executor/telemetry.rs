//! Telemetry for request and decode observability.
//!
//! The loader emits structured events through a [`TelemetrySink`] and does
//! not care how they are consumed. The default sink writes them to
//! `tracing`; hosts can plug in their own to drive counters or UI.
//!
//! # Example
//!
//! ```ignore
//! use imageloader::executor::{TelemetryEvent, TelemetrySink};
//!
//! struct CountingSink(std::sync::atomic::AtomicU64);
//!
//! impl TelemetrySink for CountingSink {
//!     fn emit(&self, event: TelemetryEvent) {
//!         if let TelemetryEvent::CacheHit { .. } = event {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::types::{ImageSize, RequestKey};

// =============================================================================
// Telemetry Events
// =============================================================================

#[derive(Clone, Debug)]
pub enum TelemetryEvent {
    // -------------------------------------------------------------------------
    // Request path
    // -------------------------------------------------------------------------
    /// A request arrived and tagged its slot.
    RequestReceived { key: RequestKey },

    /// The request was answered from the cache.
    CacheHit { key: RequestKey },

    /// The request missed the cache and a decode task was queued.
    TaskQueued { key: RequestKey, queue_depth: usize },

    // -------------------------------------------------------------------------
    // Dispatch and decode
    // -------------------------------------------------------------------------
    /// The dispatcher took a permit and handed the task to the workers.
    TaskAdmitted {
        key: RequestKey,
        queue_wait: Duration,
        in_flight: usize,
    },

    DecodeCompleted {
        key: RequestKey,
        worker_id: usize,
        sample_factor: u32,
        size: ImageSize,
        duration: Duration,
    },

    DecodeFailed {
        key: RequestKey,
        worker_id: usize,
        error: String,
    },

    /// Pending tasks dropped at shutdown.
    TasksAbandoned { count: usize },

    // -------------------------------------------------------------------------
    // Delivery
    // -------------------------------------------------------------------------
    /// The slot still wanted this key and received the image.
    Delivered { key: RequestKey },

    /// The slot had moved on to another key; the result was dropped.
    Discarded {
        key: RequestKey,
        current: Option<RequestKey>,
    },
}

impl TelemetryEvent {
    /// The request key the event is about, if any.
    pub fn key(&self) -> Option<&RequestKey> {
        match self {
            Self::RequestReceived { key }
            | Self::CacheHit { key }
            | Self::TaskQueued { key, .. }
            | Self::TaskAdmitted { key, .. }
            | Self::DecodeCompleted { key, .. }
            | Self::DecodeFailed { key, .. }
            | Self::Delivered { key }
            | Self::Discarded { key, .. } => Some(key),
            Self::TasksAbandoned { .. } => None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RequestReceived { .. } => "request_received",
            Self::CacheHit { .. } => "cache_hit",
            Self::TaskQueued { .. } => "task_queued",
            Self::TaskAdmitted { .. } => "task_admitted",
            Self::DecodeCompleted { .. } => "decode_completed",
            Self::DecodeFailed { .. } => "decode_failed",
            Self::TasksAbandoned { .. } => "tasks_abandoned",
            Self::Delivered { .. } => "delivered",
            Self::Discarded { .. } => "discarded",
        }
    }
}

// =============================================================================
// Telemetry Sink Trait
// =============================================================================

/// Receiver of telemetry events.
///
/// Events are emitted from the caller's thread, the dispatcher, workers and
/// the delivery context, so implementations must be thread-safe and fast.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TelemetryEvent);
}

// =============================================================================
// Built-in Sink Implementations
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn emit(&self, _event: TelemetryEvent) {}
}

/// Sink that logs events using the `tracing` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetrySink;

impl TelemetrySink for TracingTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        match &event {
            TelemetryEvent::RequestReceived { key } => {
                tracing::trace!(key = %key, "Request received");
            }
            TelemetryEvent::CacheHit { key } => {
                tracing::trace!(key = %key, "Cache hit");
            }
            TelemetryEvent::TaskQueued { key, queue_depth } => {
                tracing::debug!(key = %key, queue_depth, "Decode task queued");
            }
            TelemetryEvent::TaskAdmitted {
                key,
                queue_wait,
                in_flight,
            } => {
                tracing::debug!(
                    key = %key,
                    queue_wait_ms = queue_wait.as_millis() as u64,
                    in_flight,
                    "Decode task admitted"
                );
            }
            TelemetryEvent::DecodeCompleted {
                key,
                worker_id,
                sample_factor,
                size,
                duration,
            } => {
                tracing::debug!(
                    key = %key,
                    worker_id,
                    sample_factor,
                    size = %size,
                    duration_ms = duration.as_millis() as u64,
                    "Decode completed"
                );
            }
            TelemetryEvent::DecodeFailed {
                key,
                worker_id,
                error,
            } => {
                tracing::warn!(key = %key, worker_id, error = %error, "Decode failed");
            }
            TelemetryEvent::TasksAbandoned { count } => {
                tracing::info!(count, "Pending decode tasks abandoned");
            }
            TelemetryEvent::Delivered { key } => {
                tracing::trace!(key = %key, "Image delivered");
            }
            TelemetryEvent::Discarded { key, current } => {
                tracing::debug!(key = %key, current = ?current, "Stale result discarded");
            }
        }
    }
}

/// Sink that forwards events to multiple sinks.
pub struct MultiplexTelemetrySink {
    sinks: Vec<Arc<dyn TelemetrySink>>,
}

impl MultiplexTelemetrySink {
    pub fn new(sinks: Vec<Arc<dyn TelemetrySink>>) -> Self {
        Self { sinks }
    }

    pub fn add_sink(&mut self, sink: Arc<dyn TelemetrySink>) {
        self.sinks.push(sink);
    }
}

impl TelemetrySink for MultiplexTelemetrySink {
    fn emit(&self, event: TelemetryEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

impl std::fmt::Debug for MultiplexTelemetrySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiplexTelemetrySink")
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

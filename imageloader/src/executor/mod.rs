//! Bounded decode execution.
//!
//! This module holds the concurrency machinery behind the loader: a queue of
//! pending tasks, a single dispatcher that admits them one at a time, a
//! counting gate that caps in-flight work at the worker count, and the
//! worker pool that runs the decodes.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐  push + signal   ┌─────────────┐
//! │ TaskSubmitter  │ ───────────────▶ │  TaskQueue  │
//! │ (caller side)  │   (admission     │ FIFO / LIFO │
//! └────────────────┘     lock)        └──────┬──────┘
//!         │ waits on StartupGate             │ pop
//!         ▼ until dispatcher is up           ▼
//! ┌─────────────────────────────────────────────────┐
//! │ Dispatcher (dedicated thread)                   │
//! │   signal → ConcurrencyGate.acquire() → pop      │
//! └──────────────────────┬──────────────────────────┘
//!                        │ WorkItem { task, permit }
//!                        ▼
//! ┌─────────────────────────────────────────────────┐
//! │ WorkerPool (N tokio tasks)                      │
//! │   decode → cache put → deliver → drop permit    │
//! └─────────────────────────────────────────────────┘
//! ```

mod dispatcher;
mod gate;
mod queue;
mod startup;
mod submitter;
mod telemetry;
mod worker;

pub(crate) use dispatcher::Dispatcher;
pub use dispatcher::DISPATCHER_THREAD_NAME;

pub use gate::{ConcurrencyGate, GateClosed, GatePermit};

pub use queue::{ParsePolicyError, QueuePolicy, TaskQueue};

pub use startup::StartupGate;

pub(crate) use submitter::EntryPoint;
pub use submitter::{SubmitError, TaskSubmitter, DEFAULT_STARTUP_TIMEOUT};

pub use telemetry::{
    MultiplexTelemetrySink, NullTelemetrySink, TelemetryEvent, TelemetrySink,
    TracingTelemetrySink,
};

pub(crate) use worker::WorkerContext;
pub use worker::{decode_for_target, Decoded, WorkItem, WorkerPool};

//! imageloader - asynchronous image loading with bounded decoding and a
//! size-aware memory cache.
//!
//! A request names an image (a path or URI) and the display slot it is for.
//! The loader answers from its LRU cache when it can and otherwise queues a
//! decode sized to the slot. A single dispatcher admits queued decodes into
//! a fixed worker pool, never letting more than `worker_count` run at once.
//! Results reach slots through a host-provided delivery context, and only if
//! the slot is still showing the request that produced them.
//!
//! ```ignore
//! use std::sync::Arc;
//! use imageloader::{delivery, ImageLoader, ImageSlot, LoaderConfig, SlotGeometry};
//!
//! let (context, mut ui_queue) = delivery::channel();
//! let loader = ImageLoader::builder(LoaderConfig::default())
//!     .delivery(context)
//!     .build()?;
//!
//! let slot = Arc::new(ImageSlot::new(SlotGeometry::rendered(320, 240)));
//! loader.request("/photos/1.jpg", slot.clone())?;
//! // Later, on the thread that owns the slot:
//! ui_queue.run_pending();
//! ```
//!
//! # Modules
//!
//! - [`loader`]: the [`ImageLoader`] engine and its builder
//! - [`executor`]: queue, gate, dispatcher, worker pool and telemetry
//! - [`cache`]: the size-weighted LRU of decoded images
//! - [`size_policy`]: target size and sample factor computation
//! - [`delivery`]: staleness-checked result delivery
//! - [`decode`]: the decoding trait and a file decoder
//! - [`config`], [`logging`], [`system`]: configuration and ambient setup

pub mod cache;
pub mod config;
pub mod decode;
pub mod delivery;
pub mod executor;
pub mod loader;
pub mod logging;
pub mod size_policy;
pub mod slot;
pub mod system;
pub mod types;

pub use cache::{CacheStats, ImageCache};
pub use config::{ConfigFile, LoaderConfig};
pub use decode::{DecodeError, FileDecoder, ImageDecoder};
pub use delivery::{DeliveryContext, ResultDelivery};
pub use executor::QueuePolicy;
pub use loader::{ImageLoader, ImageLoaderBuilder, LoaderError, RequestOutcome};
pub use size_policy::{resolve_sample_factor, resolve_target_size, ResolutionError};
pub use slot::{DeviceMetrics, DisplaySlot, FixedDeviceMetrics, ImageSlot, SlotGeometry};
pub use types::{DecodedImage, ImageSize, RequestKey, ResultEnvelope};

/// Library version, injected from `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

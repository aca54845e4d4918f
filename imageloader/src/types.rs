//! Core value types shared across the loader.
//!
//! These are the data carried between the request path, the dispatcher,
//! the worker pool, the cache and the delivery context.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::slot::DisplaySlot;

// =============================================================================
// Request Key
// =============================================================================

/// Identifier for a requested image (a file path or URI).
///
/// Doubles as the cache key and as the staleness token stored in a slot's
/// tag. Equality is exact string equality. Cloning is a reference-count bump.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(Arc<str>);

impl RequestKey {
    /// Creates a key from any string-like value.
    pub fn new(key: impl AsRef<str>) -> Self {
        Self(Arc::from(key.as_ref()))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestKey({:?})", &*self.0)
    }
}

impl From<&str> for RequestKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for RequestKey {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl AsRef<str> for RequestKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Image Size
// =============================================================================

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns true if both dimensions fit within `other`.
    pub fn fits_within(&self, other: ImageSize) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// =============================================================================
// Decoded Image
// =============================================================================

/// Bytes per pixel of a decoded RGBA8 image.
pub const BYTES_PER_PIXEL: usize = 4;

/// A decoded, memory-resident RGBA8 image.
///
/// Shared between the cache and display slots via `Arc`.
#[derive(Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
}

impl DecodedImage {
    /// Wraps a tightly packed RGBA8 buffer.
    ///
    /// # Panics
    ///
    /// Panics if `pixels.len()` is not `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        let stride = width as usize * BYTES_PER_PIXEL;
        assert_eq!(
            pixels.len(),
            stride * height as usize,
            "pixel buffer does not match {}x{} RGBA",
            width,
            height
        );
        Self {
            pixels,
            width,
            height,
            stride,
        }
    }

    /// Creates an image of a single RGBA colour.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixels = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * BYTES_PER_PIXEL)
            .collect();
        Self::from_rgba(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Memory charged against the cache budget: `stride * height`.
    pub fn byte_size(&self) -> usize {
        self.stride * self.height as usize
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish()
    }
}

// =============================================================================
// Decode Task / Result Envelope
// =============================================================================

/// A pending decode, captured at request time and never mutated.
#[derive(Clone)]
pub struct DecodeTask {
    key: RequestKey,
    slot: Arc<dyn DisplaySlot>,
    target_size: ImageSize,
    enqueued_at: Instant,
}

impl DecodeTask {
    pub fn new(key: RequestKey, slot: Arc<dyn DisplaySlot>, target_size: ImageSize) -> Self {
        Self {
            key,
            slot,
            target_size,
            enqueued_at: Instant::now(),
        }
    }

    pub fn key(&self) -> &RequestKey {
        &self.key
    }

    pub fn slot(&self) -> &Arc<dyn DisplaySlot> {
        &self.slot
    }

    pub fn target_size(&self) -> ImageSize {
        self.target_size
    }

    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }
}

impl fmt::Debug for DecodeTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeTask")
            .field("key", &self.key)
            .field("target_size", &self.target_size)
            .field("enqueued_at", &self.enqueued_at)
            .finish_non_exhaustive()
    }
}

/// A decoded result on its way to a slot.
#[derive(Debug, Clone)]
pub struct ResultEnvelope {
    pub key: RequestKey,
    pub image: Arc<DecodedImage>,
}

impl ResultEnvelope {
    pub fn new(key: RequestKey, image: Arc<DecodedImage>) -> Self {
        Self { key, image }
    }
}

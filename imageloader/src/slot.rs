//! Display slots and device metrics.
//!
//! A display slot is the on-screen target for an image. The loader only
//! reads and writes its tag and image, and queries its geometry when sizing
//! a decode. Everything else about a slot belongs to the host.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::types::{DecodedImage, ImageSize, RequestKey};

/// Layout geometry reported by a slot, in pixels.
///
/// Values of zero or below mean "unknown". Hosts report whatever their
/// layout system has; the size policy falls back per dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotGeometry {
    /// Size the slot was actually laid out at.
    pub rendered: (i32, i32),
    /// Size requested by the slot's layout parameters.
    pub declared: (i32, i32),
    /// Maximum size the slot allows.
    pub max: (i32, i32),
}

impl SlotGeometry {
    pub fn rendered(width: i32, height: i32) -> Self {
        Self {
            rendered: (width, height),
            ..Self::default()
        }
    }

    pub fn with_declared(mut self, width: i32, height: i32) -> Self {
        self.declared = (width, height);
        self
    }

    pub fn with_max(mut self, width: i32, height: i32) -> Self {
        self.max = (width, height);
        self
    }
}

/// An externally owned display target.
///
/// `set_image` is only ever called from the delivery context.
pub trait DisplaySlot: Send + Sync {
    /// The key of the most recent request for this slot.
    fn tag(&self) -> Option<RequestKey>;

    fn set_tag(&self, key: RequestKey);

    fn set_image(&self, image: Arc<DecodedImage>);

    fn geometry(&self) -> SlotGeometry;
}

/// Provider of device-level dimensions used as the last sizing fallback.
pub trait DeviceMetrics: Send + Sync {
    /// Screen size, or `None` if unavailable.
    fn screen_size(&self) -> Option<ImageSize>;
}

/// Device metrics fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDeviceMetrics {
    screen: Option<ImageSize>,
}

impl FixedDeviceMetrics {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            screen: Some(ImageSize::new(width, height)),
        }
    }

    /// Metrics for a headless host with no screen.
    pub fn unavailable() -> Self {
        Self { screen: None }
    }
}

impl DeviceMetrics for FixedDeviceMetrics {
    fn screen_size(&self) -> Option<ImageSize> {
        self.screen
    }
}

// =============================================================================
// Reference slot
// =============================================================================

#[derive(Default)]
struct SlotState {
    tag: Option<RequestKey>,
    image: Option<Arc<DecodedImage>>,
    geometry: SlotGeometry,
    images_set: u64,
}

/// A thread-safe in-memory slot.
///
/// Records the tag, the last image shown and how many images it has
/// received. Useful for headless hosts and for tests.
#[derive(Default)]
pub struct ImageSlot {
    state: Mutex<SlotState>,
}

impl ImageSlot {
    pub fn new(geometry: SlotGeometry) -> Self {
        Self {
            state: Mutex::new(SlotState {
                geometry,
                ..SlotState::default()
            }),
        }
    }

    /// The image currently shown, if any.
    pub fn image(&self) -> Option<Arc<DecodedImage>> {
        self.state.lock().image.clone()
    }

    /// Number of `set_image` calls received.
    pub fn images_set(&self) -> u64 {
        self.state.lock().images_set
    }

    /// Updates geometry, e.g. after a relayout.
    pub fn set_geometry(&self, geometry: SlotGeometry) {
        self.state.lock().geometry = geometry;
    }
}

impl DisplaySlot for ImageSlot {
    fn tag(&self) -> Option<RequestKey> {
        self.state.lock().tag.clone()
    }

    fn set_tag(&self, key: RequestKey) {
        self.state.lock().tag = Some(key);
    }

    fn set_image(&self, image: Arc<DecodedImage>) {
        let mut state = self.state.lock();
        state.image = Some(image);
        state.images_set += 1;
    }

    fn geometry(&self) -> SlotGeometry {
        self.state.lock().geometry
    }
}

impl fmt::Debug for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ImageSlot")
            .field("tag", &state.tag)
            .field("has_image", &state.image.is_some())
            .field("geometry", &state.geometry)
            .finish()
    }
}

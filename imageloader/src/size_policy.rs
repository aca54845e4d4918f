//! Target size and downsample factor computation.
//!
//! Pure functions. The target size is resolved per dimension with the
//! fallback chain rendered → declared → max → screen; the first positive
//! value wins. The sample factor never upsamples.

use thiserror::Error;

use crate::slot::{DeviceMetrics, SlotGeometry};
use crate::types::ImageSize;

/// No positive size could be found for a slot.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("cannot resolve a target size: {dimension} unknown and screen size unavailable")]
pub struct ResolutionError {
    pub dimension: Dimension,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Width,
    Height,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Width => write!(f, "width"),
            Self::Height => write!(f, "height"),
        }
    }
}

/// Resolves the decode target size for a slot.
pub fn resolve_target_size(
    geometry: &SlotGeometry,
    metrics: &dyn DeviceMetrics,
) -> Result<ImageSize, ResolutionError> {
    let screen = metrics.screen_size();

    let width = first_positive(&[geometry.rendered.0, geometry.declared.0, geometry.max.0])
        .or_else(|| screen.map(|s| s.width).filter(|w| *w > 0))
        .ok_or(ResolutionError {
            dimension: Dimension::Width,
        })?;

    let height = first_positive(&[geometry.rendered.1, geometry.declared.1, geometry.max.1])
        .or_else(|| screen.map(|s| s.height).filter(|h| *h > 0))
        .ok_or(ResolutionError {
            dimension: Dimension::Height,
        })?;

    Ok(ImageSize::new(width, height))
}

fn first_positive(candidates: &[i32]) -> Option<u32> {
    candidates.iter().copied().find(|v| *v > 0).map(|v| v as u32)
}

/// Computes how aggressively to downsample `source` for `target`.
///
/// Returns 1 when the source already fits. Otherwise the larger of the
/// rounded per-dimension ratios, at least 1.
pub fn resolve_sample_factor(source: ImageSize, target: ImageSize) -> u32 {
    if source.fits_within(target) {
        return 1;
    }

    let ratio = |s: u32, t: u32| -> u32 {
        if t == 0 {
            return 1;
        }
        // Round half up on non-negative integers.
        ((s as u64 * 2 + t as u64) / (t as u64 * 2)) as u32
    };

    ratio(source.width, target.width)
        .max(ratio(source.height, target.height))
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot::FixedDeviceMetrics;

    fn screen() -> FixedDeviceMetrics {
        FixedDeviceMetrics::new(1080, 1920)
    }

    #[test]
    fn test_rendered_size_wins() {
        let geometry = SlotGeometry::rendered(300, 200)
            .with_declared(10, 10)
            .with_max(5, 5);
        let size = resolve_target_size(&geometry, &screen()).unwrap();
        assert_eq!(size, ImageSize::new(300, 200));
    }

    #[test]
    fn test_fallback_is_per_dimension() {
        // Width from declared, height from max.
        let geometry = SlotGeometry::rendered(0, 0)
            .with_declared(150, -2)
            .with_max(999, 80);
        let size = resolve_target_size(&geometry, &screen()).unwrap();
        assert_eq!(size, ImageSize::new(150, 80));
    }

    #[test]
    fn test_falls_back_to_screen() {
        let geometry = SlotGeometry::rendered(0, 64);
        let size = resolve_target_size(&geometry, &screen()).unwrap();
        assert_eq!(size, ImageSize::new(1080, 64));
    }

    #[test]
    fn test_unresolvable_without_screen() {
        let geometry = SlotGeometry::rendered(64, 0);
        let err = resolve_target_size(&geometry, &FixedDeviceMetrics::unavailable()).unwrap_err();
        assert_eq!(err.dimension, Dimension::Height);
    }

    #[test]
    fn test_zero_screen_is_unavailable() {
        let geometry = SlotGeometry::default();
        let err = resolve_target_size(&geometry, &FixedDeviceMetrics::new(0, 0)).unwrap_err();
        assert_eq!(err.dimension, Dimension::Width);
    }

    #[test]
    fn test_sample_factor_downsamples() {
        let factor = resolve_sample_factor(ImageSize::new(1200, 800), ImageSize::new(300, 200));
        assert_eq!(factor, 4);
    }

    #[test]
    fn test_sample_factor_never_upsamples() {
        let factor = resolve_sample_factor(ImageSize::new(100, 100), ImageSize::new(300, 200));
        assert_eq!(factor, 1);
    }

    #[test]
    fn test_sample_factor_takes_larger_ratio() {
        // 1000/400 = 2.5 -> 3, 300/300 = 1
        let factor = resolve_sample_factor(ImageSize::new(1000, 300), ImageSize::new(400, 300));
        assert_eq!(factor, 3);
    }

    #[test]
    fn test_sample_factor_rounds() {
        // 340/300 = 1.13 -> 1
        assert_eq!(
            resolve_sample_factor(ImageSize::new(340, 100), ImageSize::new(300, 200)),
            1
        );
        // 720/300 = 2.4 -> 2
        assert_eq!(
            resolve_sample_factor(ImageSize::new(720, 100), ImageSize::new(300, 200)),
            2
        );
    }
}

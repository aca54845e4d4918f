//! Default values and limits for configuration settings.

use super::settings::{CacheSettings, ConfigFile, LoaderSettings, LoggingSettings};
use crate::executor::QueuePolicy;
use crate::system::{detect_cpu_cores, detect_total_memory};

// =============================================================================
// Loader
// =============================================================================

/// Decode workers when nothing is configured.
pub const DEFAULT_WORKER_COUNT: usize = 1;

/// Upper bound for configured workers.
pub const MAX_WORKER_COUNT: usize = 256;

pub const DEFAULT_QUEUE_POLICY: QueuePolicy = QueuePolicy::Lifo;

// =============================================================================
// Cache
// =============================================================================

/// The default cache budget is this fraction of total memory.
pub const CACHE_BUDGET_DIVISOR: usize = 8;

/// Default cache budget: one eighth of detected system memory.
pub fn default_cache_budget() -> usize {
    detect_total_memory() / CACHE_BUDGET_DIVISOR
}

/// A worker count sized to the machine, for hosts that want more than one.
pub fn recommended_worker_count() -> usize {
    detect_cpu_cores().clamp(1, MAX_WORKER_COUNT)
}

/// Clamps worker count to `1..=MAX_WORKER_COUNT`, warning when clamped.
pub(super) fn clamp_worker_count(value: usize) -> usize {
    if value > MAX_WORKER_COUNT {
        tracing::warn!(
            requested = value,
            max = MAX_WORKER_COUNT,
            "workers above maximum, clamping to {}",
            MAX_WORKER_COUNT
        );
        MAX_WORKER_COUNT
    } else {
        value.max(1)
    }
}

// =============================================================================
// Logging
// =============================================================================

pub const DEFAULT_LOG_DIRECTORY: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "imageloader.log";

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            loader: LoaderSettings {
                workers: DEFAULT_WORKER_COUNT,
                queue_policy: DEFAULT_QUEUE_POLICY,
            },
            cache: CacheSettings { memory_size: None },
            logging: LoggingSettings {
                directory: DEFAULT_LOG_DIRECTORY.into(),
                file: DEFAULT_LOG_FILE.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cache_budget_is_fraction_of_memory() {
        assert_eq!(default_cache_budget(), detect_total_memory() / 8);
        assert!(default_cache_budget() > 0);
    }

    #[test]
    fn test_clamp_worker_count() {
        assert_eq!(clamp_worker_count(0), 1);
        assert_eq!(clamp_worker_count(4), 4);
        assert_eq!(clamp_worker_count(10_000), MAX_WORKER_COUNT);
    }

    #[test]
    fn test_recommended_worker_count() {
        let n = recommended_worker_count();
        assert!((1..=MAX_WORKER_COUNT).contains(&n));
    }
}

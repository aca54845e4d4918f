//! Runtime configuration for an [`ImageLoader`](crate::ImageLoader).

use super::defaults::{default_cache_budget, DEFAULT_QUEUE_POLICY, DEFAULT_WORKER_COUNT};
use super::size::format_size;
use crate::executor::QueuePolicy;
use crate::loader::LoaderError;

/// Fixed at construction; the loader never reconfigures itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Decode workers. Also the number of concurrency gate permits.
    pub worker_count: usize,
    pub queue_policy: QueuePolicy,
    /// Maximum total byte size of cached decoded images.
    pub cache_budget_bytes: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_policy: DEFAULT_QUEUE_POLICY,
            cache_budget_bytes: default_cache_budget(),
        }
    }
}

impl LoaderConfig {
    pub fn new(worker_count: usize, queue_policy: QueuePolicy, cache_budget_bytes: usize) -> Self {
        Self {
            worker_count,
            queue_policy,
            cache_budget_bytes,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    pub fn with_queue_policy(mut self, queue_policy: QueuePolicy) -> Self {
        self.queue_policy = queue_policy;
        self
    }

    pub fn with_cache_budget(mut self, bytes: usize) -> Self {
        self.cache_budget_bytes = bytes;
        self
    }

    /// Rejects configurations the loader cannot run with.
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.worker_count == 0 {
            return Err(LoaderError::InvalidConfig(
                "worker_count must be at least 1".into(),
            ));
        }
        if self.cache_budget_bytes == 0 {
            return Err(LoaderError::InvalidConfig(
                "cache_budget_bytes must be positive".into(),
            ));
        }
        Ok(())
    }

    /// One-line summary for startup logs.
    pub fn summary(&self) -> String {
        format!(
            "workers={} policy={} cache={}",
            self.worker_count,
            self.queue_policy,
            format_size(self.cache_budget_bytes)
        )
    }
}

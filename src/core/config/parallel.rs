//! Worker pool configuration for the calibrator.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator, ensure_range};

/// Configuration for parallel grid-search evaluation.
///
/// Calibration runs on a dedicated rayon pool rather than the global one, so a
/// caller can keep part of the machine free while a long search is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Hard cap on the number of worker threads.
    /// If None, the pool size is derived from `worker_fraction`.
    /// Default: None
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Fraction of the available hardware parallelism to use, in (0, 1].
    /// Default: 0.8
    #[serde(default = "ParallelPolicy::default_worker_fraction")]
    pub worker_fraction: f64,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the fraction of hardware threads to use.
    pub fn with_worker_fraction(mut self, fraction: f64) -> Self {
        self.worker_fraction = fraction;
        self
    }

    /// Number of workers this policy resolves to on the current machine.
    ///
    /// Always at least one.
    pub fn worker_count(&self) -> usize {
        if let Some(max) = self.max_threads {
            return max.max(1);
        }
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        ((available as f64 * self.worker_fraction).floor() as usize).max(1)
    }

    /// Builds a local rayon thread pool sized by [`worker_count`](Self::worker_count).
    pub fn build_pool(&self) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
        let threads = self.worker_count();
        tracing::debug!("building calibration pool with {} workers", threads);
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("oar-form-calib-{index}"))
            .build()
    }

    /// Default fraction of hardware parallelism.
    fn default_worker_fraction() -> f64 {
        0.8
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            worker_fraction: Self::default_worker_fraction(),
        }
    }
}

impl ConfigValidator for ParallelPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == Some(0) {
            return Err(ConfigError::invalid("max_threads", "must be positive"));
        }
        if self.worker_fraction <= 0.0 {
            return Err(ConfigError::invalid(
                "worker_fraction",
                format!("must be positive, got {}", self.worker_fraction),
            ));
        }
        ensure_range("worker_fraction", self.worker_fraction, 0.0, 1.0)
    }
}

//! Configuration types for detection, scheduling, and calibration.
//!
//! Every configuration struct validates itself before the component that
//! consumes it is constructed, so the engine never runs with an invalid
//! configuration.

pub mod calibration;
pub mod validation;
pub mod weights;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, TwinscanError};

pub use calibration::{GeneticConfig, GridSearchConfig, ValidatorConfig};
pub use validation::{
    validate_non_negative, validate_positive_f64, validate_positive_usize, validate_unit_range,
};
pub use weights::{SimilarityWeights, MIN_PRIMARY_WEIGHT, WEIGHT_SUM_TOLERANCE};

/// Similarity detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Factor weights
    #[serde(default)]
    pub weights: SimilarityWeights,

    /// Minimum score for a pair to be reported as a match
    pub threshold: f64,

    /// Line-count ratio above which the structural factor is penalized
    pub max_line_difference_ratio: f64,

    /// Statement count at or below which a function counts as near-empty
    pub max_empty_vs_populated: usize,

    /// Type-list edit distance above which signatures count as divergent
    pub max_signature_length_diff: usize,

    /// Maximum number of cached pair scores
    pub cache_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: 0.8,
            max_line_difference_ratio: 3.0,
            max_empty_vs_populated: 1,
            max_signature_length_diff: 1,
            cache_capacity: 100_000,
        }
    }
}

impl DetectorConfig {
    /// Replace the weights, keeping every other setting.
    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Replace the match threshold.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Validate detector configuration
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        validate_unit_range(self.threshold, "threshold")?;

        if self.max_line_difference_ratio.is_nan() || self.max_line_difference_ratio < 1.0 {
            return Err(TwinscanError::validation_field(
                "max_line_difference_ratio must be at least 1.0",
                "max_line_difference_ratio",
                ">= 1.0",
                self.max_line_difference_ratio.to_string(),
            ));
        }

        validate_positive_usize(self.cache_capacity, "cache_capacity")?;
        Ok(())
    }
}

/// Parallel comparison scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Worker thread count; 0 means one per logical CPU
    #[serde(default)]
    pub workers: usize,

    /// Completions between progress callbacks
    pub progress_interval: usize,

    /// Capacity of the bounded job and result queues
    pub queue_capacity: usize,

    /// Stop computing new comparisons after the first failure
    #[serde(default)]
    pub cancel_on_error: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            progress_interval: 100,
            queue_capacity: 1024,
            cancel_on_error: false,
        }
    }
}

impl SchedulerConfig {
    /// Use a fixed worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Number of worker threads a run will actually spawn
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get().max(1)
        } else {
            self.workers
        }
    }

    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.progress_interval, "progress_interval")?;
        validate_positive_usize(self.queue_capacity, "queue_capacity")?;
        Ok(())
    }
}

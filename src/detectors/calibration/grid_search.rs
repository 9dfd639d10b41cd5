//! Exhaustive grid search over the weight simplex.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::validator::{StatisticalValidator, ValidationMetrics};
use crate::core::config::{GridSearchConfig, SimilarityWeights};
use crate::core::errors::Result;

/// One evaluated grid point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Candidate weights
    pub weights: SimilarityWeights,
    /// Composite validation score
    pub composite: f64,
}

/// Result of a grid search run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    /// Best weight vector found
    pub best_weights: SimilarityWeights,
    /// Metrics of the best weight vector
    pub best_metrics: ValidationMetrics,
    /// Number of weight vectors scored, baseline included
    pub iterations: usize,
    /// Every scored vector in evaluation order
    pub evaluated: Vec<GridPoint>,
}

impl GridSearchResult {
    /// Composite score of the best vector
    pub fn best_score(&self) -> f64 {
        self.best_metrics.composite
    }
}

/// Deterministic grid search
#[derive(Debug, Clone)]
pub struct GridSearch {
    config: GridSearchConfig,
}

impl GridSearch {
    /// Create a grid search; the configuration is validated first.
    pub fn new(config: GridSearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Grid configuration
    pub fn config(&self) -> &GridSearchConfig {
        &self.config
    }

    /// All grid vectors: primary weights are positive multiples of `step`
    /// summing to one, crossed with every penalty value.
    pub fn candidates(&self) -> Vec<SimilarityWeights> {
        let units = self.config.units();
        let step = self.config.step;
        let mut candidates = Vec::new();

        for a in 1..units {
            for b in 1..units - a {
                for c in 1..units - a - b {
                    let d = units - a - b - c;
                    let primary = [a, b, c, d].map(|u| u as f64 * step);
                    for &penalty in &self.config.penalty_values {
                        candidates.push(SimilarityWeights::from_primary(primary, penalty));
                    }
                }
            }
        }

        candidates
    }

    /// Score every grid vector and keep the best.
    ///
    /// With `include_baseline` the baseline is scored first and only a
    /// strictly better vector replaces it.
    pub fn run(&self, validator: &StatisticalValidator, baseline: &SimilarityWeights) -> Result<GridSearchResult> {
        baseline.validate()?;

        let mut candidates = Vec::new();
        if self.config.include_baseline {
            candidates.push(*baseline);
        }
        candidates.extend(self.candidates());

        let scored: Vec<(SimilarityWeights, ValidationMetrics)> = candidates
            .par_iter()
            .map(|weights| (*weights, validator.validate(weights)))
            .collect();

        let mut best_index = 0;
        for (index, (_, metrics)) in scored.iter().enumerate() {
            if metrics.composite > scored[best_index].1.composite {
                best_index = index;
            }
        }

        let evaluated: Vec<GridPoint> = scored
            .iter()
            .map(|(weights, metrics)| GridPoint {
                weights: *weights,
                composite: metrics.composite,
            })
            .collect();
        let iterations = scored.len();
        let (best_weights, best_metrics) = scored.into_iter().nth(best_index).unwrap_or_else(|| {
            let metrics = validator.validate(baseline);
            (*baseline, metrics)
        });

        info!(
            "Grid search scored {} vectors; best composite {:.4}",
            iterations, best_metrics.composite
        );

        Ok(GridSearchResult {
            best_weights,
            best_metrics,
            iterations,
            evaluated,
        })
    }
}

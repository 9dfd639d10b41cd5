//! Weight calibration against a labeled validation suite.
//!
//! - [`StatisticalValidator`] scores one weight vector (MAE, MSE, R², F1,
//!   accuracy, robustness, composite)
//! - [`GridSearch`] exhaustively scores a fixed-step grid of vectors
//! - [`GeneticOptimizer`] evolves a population of vectors
//!
//! Calibration is pure computation over in-memory data: configuration
//! errors are reported at setup and nothing fails mid-run.

pub mod genetic;
pub mod grid_search;
pub mod suite;
pub mod validator;

pub use genetic::{
    crossover, mutate, GenerationStats, GeneticOptimizer, GeneticResult, Individual, Population,
};
pub use grid_search::{GridPoint, GridSearch, GridSearchResult};
pub use suite::{ValidationCase, ValidationCategory, ValidationSuite};
pub use validator::{composite_score, StatisticalValidator, ValidationMetrics};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::core::config::{GeneticConfig, GridSearchConfig, SimilarityWeights};
use crate::core::errors::Result;

/// Which search produced the recommended weights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationSource {
    /// The caller's weights were not beaten
    Baseline,
    /// Exhaustive grid search
    GridSearch,
    /// Genetic optimizer
    Genetic,
}

/// Grid and genetic outcomes compared against the baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Weights the calibration started from
    pub baseline_weights: SimilarityWeights,
    /// Metrics of the baseline weights
    pub baseline_metrics: ValidationMetrics,
    /// Grid search outcome
    pub grid: GridSearchResult,
    /// Genetic optimizer outcome
    pub genetic: GeneticResult,
    /// Search that produced the recommendation
    pub source: CalibrationSource,
    /// Best weights overall
    pub recommended: SimilarityWeights,
    /// Composite score of the recommendation
    pub recommended_score: f64,
}

impl CalibrationReport {
    /// Composite improvement of the recommendation over the baseline
    pub fn improvement(&self) -> f64 {
        self.recommended_score - self.baseline_metrics.composite
    }
}

/// Run grid search and the genetic optimizer and recommend the better vector.
pub fn calibrate(
    validator: &StatisticalValidator,
    baseline: &SimilarityWeights,
    grid_config: GridSearchConfig,
    genetic_config: GeneticConfig,
) -> Result<CalibrationReport> {
    // Both searches validate their own configuration before any work starts.
    let grid_search = GridSearch::new(grid_config)?;
    let optimizer = GeneticOptimizer::new(genetic_config)?;
    baseline.validate()?;

    let baseline_metrics = validator.validate(baseline);
    let grid = grid_search.run(validator, baseline)?;
    let genetic = optimizer.run(validator, baseline)?;

    let mut source = CalibrationSource::Baseline;
    let mut recommended = *baseline;
    let mut recommended_score = baseline_metrics.composite;

    if grid.best_metrics.composite > recommended_score {
        source = CalibrationSource::GridSearch;
        recommended = grid.best_weights;
        recommended_score = grid.best_metrics.composite;
    }
    if genetic.best_metrics.composite > recommended_score {
        source = CalibrationSource::Genetic;
        recommended = genetic.best.weights;
        recommended_score = genetic.best_metrics.composite;
    }

    info!(
        "Calibration recommends {:?} weights (composite {:.4}, baseline {:.4})",
        source, recommended_score, baseline_metrics.composite
    );

    Ok(CalibrationReport {
        baseline_weights: *baseline,
        baseline_metrics,
        grid,
        genetic,
        source,
        recommended,
        recommended_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ValidatorConfig;

    #[test]
    fn recommendation_never_loses_to_baseline() {
        let validator =
            StatisticalValidator::new(ValidationSuite::builtin(), ValidatorConfig::default()).unwrap();
        let baseline = SimilarityWeights::default();
        let grid = GridSearchConfig {
            step: 0.25,
            penalty_values: vec![0.5],
            include_baseline: true,
        };
        let genetic = GeneticConfig {
            population_size: 6,
            generations: 3,
            elite_size: 1,
            ..GeneticConfig::default()
        }
        .with_seed(11);

        let report = calibrate(&validator, &baseline, grid, genetic).unwrap();

        assert!(report.improvement() >= 0.0);
        assert!(report.recommended_score >= report.grid.best_score());
        assert!(report.recommended_score >= report.genetic.best_metrics.composite);
        assert!(report.recommended.validate().is_ok());
        if report.source == CalibrationSource::Baseline {
            assert_eq!(report.recommended, baseline);
        }
    }

    #[test]
    fn invalid_search_config_fails_before_running() {
        let validator =
            StatisticalValidator::new(ValidationSuite::builtin(), ValidatorConfig::default()).unwrap();
        let grid = GridSearchConfig {
            step: 0.0,
            ..GridSearchConfig::default()
        };
        let result = calibrate(&validator, &SimilarityWeights::default(), grid, GeneticConfig::default());
        assert!(result.is_err());
    }
}

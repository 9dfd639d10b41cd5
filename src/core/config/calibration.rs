//! Weight calibration configuration types.
//!
//! This module contains configuration for the statistical validator, the
//! exhaustive grid search, and the genetic optimizer.

use serde::{Deserialize, Serialize};

use super::validation::{
    validate_non_negative, validate_positive_f64, validate_positive_usize, validate_unit_range,
};
use crate::core::errors::{Result, TwinscanError};

/// Statistical validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// Boundary at which a similarity counts as "is duplicate"
    pub duplicate_threshold: f64,

    /// Extra lines added to the line range by the line-stretch perturbation
    pub perturbation_line_stretch: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.7,
            perturbation_line_stretch: 3,
        }
    }
}

impl ValidatorConfig {
    /// Validate validator configuration
    pub fn validate(&self) -> Result<()> {
        validate_unit_range(self.duplicate_threshold, "duplicate_threshold")
    }
}

/// Grid search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchConfig {
    /// Grid resolution for the primary weights; 1/step must be an integer
    pub step: f64,

    /// Candidate values for the different-signature penalty
    pub penalty_values: Vec<f64>,

    /// Evaluate the caller's baseline weights before the grid
    #[serde(default = "default_include_baseline")]
    pub include_baseline: bool,
}

fn default_include_baseline() -> bool {
    true
}

impl Default for GridSearchConfig {
    fn default() -> Self {
        Self {
            step: 0.05,
            penalty_values: vec![0.25, 0.5, 0.75],
            include_baseline: true,
        }
    }
}

impl GridSearchConfig {
    /// Number of grid units along each primary axis
    pub fn units(&self) -> usize {
        (1.0 / self.step).round() as usize
    }

    /// Validate grid search configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_f64(self.step, "step")?;

        let units = self.units();
        if units < 4 || ((units as f64) * self.step - 1.0).abs() > 1e-9 {
            return Err(TwinscanError::validation_field(
                "step must divide 1.0 into at least 4 equal units",
                "step",
                "1/n for n >= 4",
                self.step.to_string(),
            ));
        }

        if self.penalty_values.is_empty() {
            return Err(TwinscanError::validation(
                "penalty_values must contain at least one value",
            ));
        }
        for value in &self.penalty_values {
            validate_unit_range(*value, "penalty_values")?;
        }

        Ok(())
    }
}

/// Genetic optimizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Individuals per generation
    pub population_size: usize,

    /// Number of generations to evolve
    pub generations: usize,

    /// Probability that a child is mutated
    pub mutation_rate: f64,

    /// Probability that a child is produced by crossover
    pub crossover_rate: f64,

    /// Individuals copied unchanged into the next generation
    pub elite_size: usize,

    /// Maximum absolute perturbation applied by one mutation
    pub mutation_strength: f64,

    /// Best-fitness improvement below which a generation counts as stalled
    pub convergence_epsilon: f64,

    /// Consecutive stalled generations that mark convergence
    pub convergence_window: usize,

    /// RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            generations: 50,
            mutation_rate: 0.2,
            crossover_rate: 0.7,
            elite_size: 2,
            mutation_strength: 0.1,
            convergence_epsilon: 1e-4,
            convergence_window: 5,
            seed: None,
        }
    }
}

impl GeneticConfig {
    /// Fix the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate genetic optimizer configuration
    pub fn validate(&self) -> Result<()> {
        validate_positive_usize(self.population_size, "population_size")?;
        validate_positive_usize(self.generations, "generations")?;
        validate_unit_range(self.mutation_rate, "mutation_rate")?;
        validate_unit_range(self.crossover_rate, "crossover_rate")?;

        if self.elite_size >= self.population_size {
            return Err(TwinscanError::validation_field(
                "elite_size must be smaller than population_size",
                "elite_size",
                format!("< {}", self.population_size),
                self.elite_size.to_string(),
            ));
        }

        // Mutation deltas are drawn from [-strength, strength].
        validate_positive_f64(self.mutation_strength, "mutation_strength")?;
        validate_unit_range(self.mutation_strength, "mutation_strength")?;
        validate_non_negative(self.convergence_epsilon, "convergence_epsilon")?;
        validate_positive_usize(self.convergence_window, "convergence_window")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_genetic_error<F: FnOnce(&mut GeneticConfig)>(modifier: F, needle: &str) {
        let mut cfg = GeneticConfig::default();
        modifier(&mut cfg);
        let message = cfg
            .validate()
            .expect_err("expected validation failure")
            .to_string();
        assert!(
            message.contains(needle),
            "expected message containing '{needle}', got '{message}'"
        );
    }

    #[test]
    fn genetic_config_validation_rules() {
        assert!(GeneticConfig::default().validate().is_ok());

        expect_genetic_error(|cfg| cfg.population_size = 0, "population_size");
        expect_genetic_error(|cfg| cfg.generations = 0, "generations");
        expect_genetic_error(|cfg| cfg.mutation_rate = 1.5, "mutation_rate");
        expect_genetic_error(|cfg| cfg.crossover_rate = -0.1, "crossover_rate");
        expect_genetic_error(|cfg| cfg.elite_size = 30, "elite_size");
        expect_genetic_error(|cfg| cfg.mutation_strength = 0.0, "mutation_strength");
        expect_genetic_error(|cfg| cfg.mutation_strength = f64::INFINITY, "mutation_strength");
        expect_genetic_error(|cfg| cfg.mutation_strength = 1e300, "mutation_strength");
        expect_genetic_error(|cfg| cfg.mutation_strength = f64::NAN, "mutation_strength");
        expect_genetic_error(|cfg| cfg.convergence_window = 0, "convergence_window");
    }

    #[test]
    fn grid_config_validation_rules() {
        let cfg = GridSearchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.units(), 20);

        let mut bad = cfg.clone();
        bad.step = 0.3;
        assert!(bad.validate().unwrap_err().to_string().contains("step"));

        let mut bad = cfg.clone();
        bad.step = 0.5;
        assert!(bad.validate().is_err());

        let mut bad = cfg.clone();
        bad.penalty_values.clear();
        assert!(bad.validate().unwrap_err().to_string().contains("penalty_values"));

        let mut bad = cfg;
        bad.penalty_values = vec![1.5];
        assert!(bad.validate().is_err());
    }

    #[test]
    fn validator_config_validation() {
        assert!(ValidatorConfig::default().validate().is_ok());
        let cfg = ValidatorConfig {
            duplicate_threshold: 2.0,
            ..ValidatorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}

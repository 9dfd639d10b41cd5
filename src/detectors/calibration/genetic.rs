//! Genetic optimizer for similarity weights.
//!
//! Each generation keeps its elites unchanged and fills the remaining slots
//! with children bred from roulette-selected parents. Every child is
//! renormalized before evaluation so the primary weights always sum to one.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::validator::{StatisticalValidator, ValidationMetrics};
use crate::core::config::{GeneticConfig, SimilarityWeights, MIN_PRIMARY_WEIGHT};
use crate::core::errors::Result;

/// Number of genes: four primary weights plus the penalty
const GENE_COUNT: usize = 5;

/// Candidate weights and their fitness
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    /// Candidate weights (always normalized)
    pub weights: SimilarityWeights,
    /// Composite validation score
    pub fitness: f64,
}

impl Individual {
    fn unevaluated(weights: SimilarityWeights) -> Self {
        Self {
            weights,
            fitness: 0.0,
        }
    }
}

/// Individuals of one generation
pub type Population = Vec<Individual>;

/// Summary of one generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation number, starting at 1
    pub generation: usize,
    /// Best fitness in this generation
    pub best_fitness: f64,
    /// Mean fitness of this generation
    pub mean_fitness: f64,
    /// Weights of the best individual
    pub best_weights: SimilarityWeights,
}

/// Result of a genetic optimization run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneticResult {
    /// Best individual seen in any generation
    pub best: Individual,
    /// Full metrics of the best individual
    pub best_metrics: ValidationMetrics,
    /// Per-generation summaries
    pub history: Vec<GenerationStats>,
    /// First generation of the first stalled window, or the last generation
    pub convergence_generation: usize,
    /// Number of fitness evaluations performed
    pub evaluations: usize,
}

/// Blend two weight vectors gene by gene and renormalize.
pub fn crossover(a: &SimilarityWeights, b: &SimilarityWeights, alpha: f64) -> SimilarityWeights {
    let alpha = alpha.clamp(0.0, 1.0);
    let blend = |x: f64, y: f64| alpha * x + (1.0 - alpha) * y;
    let primary_a = a.primary();
    let primary_b = b.primary();
    let primary = [0, 1, 2, 3].map(|i| blend(primary_a[i], primary_b[i]));
    SimilarityWeights::from_primary(
        primary,
        blend(a.different_signature_penalty, b.different_signature_penalty),
    )
    .normalized()
}

/// Shift one gene by `delta` and renormalize.
pub fn mutate(weights: &SimilarityWeights, gene: usize, delta: f64) -> SimilarityWeights {
    let mut mutated = *weights;
    if gene % GENE_COUNT == GENE_COUNT - 1 {
        mutated.different_signature_penalty = (mutated.different_signature_penalty + delta).clamp(0.0, 1.0);
    } else {
        let mut primary = mutated.primary();
        let index = gene % GENE_COUNT;
        primary[index] = (primary[index] + delta).max(MIN_PRIMARY_WEIGHT);
        mutated.set_primary(primary);
    }
    mutated.normalized()
}

/// Genetic weight optimizer
#[derive(Debug, Clone)]
pub struct GeneticOptimizer {
    config: GeneticConfig,
}

impl GeneticOptimizer {
    /// Create an optimizer; the configuration is validated first.
    pub fn new(config: GeneticConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Optimizer configuration
    pub fn config(&self) -> &GeneticConfig {
        &self.config
    }

    /// Evolve the population for the configured number of generations.
    pub fn run(&self, validator: &StatisticalValidator, baseline: &SimilarityWeights) -> Result<GeneticResult> {
        baseline.validate()?;

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut population = self.initial_population(baseline, &mut rng);
        let mut history = Vec::with_capacity(self.config.generations);
        let mut evaluations = 0;
        let mut best = Individual {
            weights: *baseline,
            fitness: f64::NEG_INFINITY,
        };

        for generation in 1..=self.config.generations {
            evaluate(&mut population, validator);
            evaluations += population.len();

            population.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
            let leader = population[0];
            if leader.fitness > best.fitness {
                best = leader;
            }

            let mean_fitness = population.iter().map(|i| i.fitness).sum::<f64>() / population.len() as f64;
            history.push(GenerationStats {
                generation,
                best_fitness: leader.fitness,
                mean_fitness,
                best_weights: leader.weights,
            });
            debug!(
                "Generation {}: best {:.4}, mean {:.4}",
                generation, leader.fitness, mean_fitness
            );

            if generation < self.config.generations {
                population = self.next_generation(&population, &mut rng);
            }
        }

        let convergence_generation = convergence_generation(
            &history,
            self.config.convergence_epsilon,
            self.config.convergence_window,
        );
        let best_metrics = validator.validate(&best.weights);

        info!(
            "Genetic optimization finished: best fitness {:.4} after {} evaluations, converged at generation {}",
            best.fitness, evaluations, convergence_generation
        );

        Ok(GeneticResult {
            best,
            best_metrics,
            history,
            convergence_generation,
            evaluations,
        })
    }

    fn initial_population(&self, baseline: &SimilarityWeights, rng: &mut StdRng) -> Population {
        let mut population = Vec::with_capacity(self.config.population_size);
        population.push(Individual::unevaluated(baseline.normalized()));

        while population.len() < self.config.population_size {
            let primary = [0; 4].map(|_| rng.gen_range(0.05..1.0));
            let penalty = rng.gen_range(0.0..=1.0);
            population.push(Individual::unevaluated(
                SimilarityWeights::from_primary(primary, penalty).normalized(),
            ));
        }

        population
    }

    /// Build the next generation from a population sorted best-first.
    fn next_generation(&self, ranked: &[Individual], rng: &mut StdRng) -> Population {
        let size = self.config.population_size;
        let mut next: Population = ranked.iter().take(self.config.elite_size).copied().collect();

        let selector = WeightedIndex::new(ranked.iter().map(|i| i.fitness.max(0.0) + 1e-9)).ok();
        let pick = |rng: &mut StdRng| match &selector {
            Some(dist) => ranked[dist.sample(rng)],
            None => ranked[rng.gen_range(0..ranked.len())],
        };

        while next.len() < size {
            let first = pick(rng);
            let mut child = if rng.gen_bool(self.config.crossover_rate) {
                let second = pick(rng);
                crossover(&first.weights, &second.weights, rng.gen())
            } else {
                first.weights
            };

            if rng.gen_bool(self.config.mutation_rate) {
                let strength = self.config.mutation_strength;
                let gene = rng.gen_range(0..GENE_COUNT);
                child = mutate(&child, gene, rng.gen_range(-strength..=strength));
            }

            next.push(Individual::unevaluated(child.normalized()));
        }

        next
    }
}

fn evaluate(population: &mut Population, validator: &StatisticalValidator) {
    population.par_iter_mut().for_each(|individual| {
        individual.fitness = validator.validate(&individual.weights).composite;
    });
}

/// First generation that starts `window` consecutive stalled generations.
///
/// A generation is stalled when the best-so-far fitness improves by less
/// than `epsilon` over the previous generation. Without such a window the
/// last generation is reported.
pub fn convergence_generation(history: &[GenerationStats], epsilon: f64, window: usize) -> usize {
    let window = window.max(1);
    let mut best_so_far = f64::NEG_INFINITY;
    let mut streak_start = None;
    let mut streak = 0;

    for stats in history {
        let improvement = stats.best_fitness - best_so_far;
        let stalled = best_so_far.is_finite() && improvement < epsilon;
        best_so_far = best_so_far.max(stats.best_fitness);

        if stalled {
            if streak == 0 {
                streak_start = Some(stats.generation);
            }
            streak += 1;
            if streak >= window {
                return streak_start.unwrap_or(stats.generation);
            }
        } else {
            streak = 0;
        }
    }

    history.last().map_or(0, |stats| stats.generation)
}

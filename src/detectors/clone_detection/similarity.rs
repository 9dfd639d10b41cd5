//! Multi-factor similarity scoring between two function descriptors.
//!
//! The score blends four factors computed over normalized forms:
//!
//! - **tree edit**: normalized tree edit distance of the canonical trees
//! - **token**: Dice overlap of the coarse token multisets
//! - **structural**: agreement of the control-flow skeletons, penalized for
//!   large line-count ratios and zeroed for near-empty vs populated bodies
//! - **signature**: edit distance over parameter and return type lists
//!
//! Factors do not depend on the weights, so calibration computes them once
//! and re-combines them for every candidate weight vector.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cache::{CacheStatistics, SimilarityCache};
use super::normalization::{ControlSkeleton, FunctionSignature};
use super::tree_edit::tree_edit_similarity;
use crate::core::config::{DetectorConfig, SimilarityWeights};
use crate::core::errors::Result;
use crate::core::function::FunctionDescriptor;

/// Weight-independent similarity factors for one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityFactors {
    /// Normalized tree edit similarity
    pub tree_edit: f64,
    /// Token multiset overlap
    pub token: f64,
    /// Control-flow skeleton agreement after penalties
    pub structural: f64,
    /// Type list similarity
    pub signature: f64,
    /// Signatures differ by more than the configured distance
    pub signature_divergent: bool,
    /// Structural hashes are equal
    pub identical: bool,
}

impl SimilarityFactors {
    /// Factors of a structurally identical pair
    pub fn identical() -> Self {
        Self {
            tree_edit: 1.0,
            token: 1.0,
            structural: 1.0,
            signature: 1.0,
            signature_divergent: false,
            identical: true,
        }
    }

    /// Blend the factors into a score in [0, 1].
    ///
    /// Divergent signatures drop the signature factor: the body factors are
    /// averaged by their own weights and scaled by `1 - penalty`.
    pub fn combine(&self, weights: &SimilarityWeights) -> f64 {
        if self.identical {
            return 1.0;
        }

        let body = weights.tree_edit * self.tree_edit
            + weights.token_similarity * self.token
            + weights.structural * self.structural;

        let raw = if self.signature_divergent {
            let body_weight = weights.tree_edit + weights.token_similarity + weights.structural;
            if body_weight <= 0.0 {
                0.0
            } else {
                (body / body_weight) * (1.0 - weights.different_signature_penalty)
            }
        } else {
            body + weights.signature * self.signature
        };

        if raw.is_finite() {
            raw.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Dice coefficient over two token multisets.
pub fn token_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut counts: AHashMap<&str, usize> = AHashMap::with_capacity(a.len());
    for token in a {
        *counts.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut shared = 0usize;
    for token in b {
        if let Some(count) = counts.get_mut(token.as_str()) {
            if *count > 0 {
                *count -= 1;
                shared += 1;
            }
        }
    }

    (2 * shared) as f64 / (a.len() + b.len()) as f64
}

/// Mean min/max ratio over the skeleton features; equal zeros count as agreement.
pub fn skeleton_similarity(a: &ControlSkeleton, b: &ControlSkeleton) -> f64 {
    let features_a = a.features();
    let features_b = b.features();
    let total: f64 = features_a
        .iter()
        .zip(features_b.iter())
        .map(|(&x, &y)| {
            let largest = x.max(y);
            if largest == 0 {
                1.0
            } else {
                x.min(y) as f64 / largest as f64
            }
        })
        .sum();
    total / features_a.len() as f64
}

/// Levenshtein distance between two type lists.
pub fn type_list_distance(a: &[String], b: &[String]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, left) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, right) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(left != right);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Signature similarity and the raw type-list distance behind it
pub fn signature_similarity(a: &FunctionSignature, b: &FunctionSignature) -> (f64, usize) {
    let distance = type_list_distance(&a.params, &b.params) + type_list_distance(&a.returns, &b.returns);
    let span = a.params.len().max(b.params.len()) + a.returns.len().max(b.returns.len());
    if span == 0 {
        return (1.0, 0);
    }
    (1.0 - distance as f64 / span as f64, distance)
}

/// Weighted multi-factor similarity detector with a shared factor cache
///
/// The cache holds the hash-determined factors of a pair. The line-count
/// penalty depends on the descriptors rather than their hashes, so it is
/// applied on every call.
#[derive(Debug)]
pub struct SimilarityDetector {
    config: DetectorConfig,
    cache: SimilarityCache<SimilarityFactors>,
}

impl SimilarityDetector {
    /// Create a detector; the configuration is validated first.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        let cache = SimilarityCache::with_capacity(config.cache_capacity);
        Ok(Self { config, cache })
    }

    /// Detector configuration
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Weights used by [`Self::score`]
    pub fn weights(&self) -> &SimilarityWeights {
        &self.config.weights
    }

    /// Shared factor cache
    pub fn cache(&self) -> &SimilarityCache<SimilarityFactors> {
        &self.cache
    }

    /// Cache counters
    pub fn cache_statistics(&self) -> CacheStatistics {
        self.cache.statistics()
    }

    /// Score in [0, 1]; malformed descriptors fall back to the hash comparison.
    pub fn score(&self, a: &FunctionDescriptor, b: &FunctionDescriptor) -> f64 {
        match self.try_score(a, b) {
            Ok(score) => score,
            Err(err) => {
                debug!("Falling back to hash comparison for {} / {}: {}", a, b, err);
                if a.structural_hash() == b.structural_hash() {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Score in [0, 1], reporting malformed descriptors as errors.
    pub fn try_score(&self, a: &FunctionDescriptor, b: &FunctionDescriptor) -> Result<f64> {
        a.validate()?;
        b.validate()?;

        let hash_a = a.structural_hash();
        let hash_b = b.structural_hash();
        if hash_a == hash_b {
            return Ok(1.0);
        }

        let base = match self.cache.get(hash_a, hash_b) {
            Some(factors) => factors,
            None => {
                let factors = self.hash_factors(a, b);
                self.cache.insert(hash_a, hash_b, factors);
                factors
            }
        };

        let factors = self.with_line_penalty(base, a.line_count(), b.line_count());
        Ok(factors.combine(&self.config.weights))
    }

    /// Whether a score reaches the configured threshold
    pub fn is_above_threshold(&self, score: f64) -> bool {
        score >= self.config.threshold
    }

    /// Compute the weight-independent factors for a pair (never cached).
    pub fn factors(&self, a: &FunctionDescriptor, b: &FunctionDescriptor) -> SimilarityFactors {
        let base = self.hash_factors(a, b);
        self.with_line_penalty(base, a.line_count(), b.line_count())
    }

    /// Factors fully determined by the two normalized forms.
    fn hash_factors(&self, a: &FunctionDescriptor, b: &FunctionDescriptor) -> SimilarityFactors {
        let form_a = a.normalized_form();
        let form_b = b.normalized_form();

        if form_a.structural_hash() == form_b.structural_hash() {
            return SimilarityFactors::identical();
        }

        let (signature, distance) = signature_similarity(a.signature(), b.signature());

        SimilarityFactors {
            tree_edit: tree_edit_similarity(form_a.root(), form_b.root()),
            token: token_similarity(form_a.tokens(), form_b.tokens()),
            structural: self.skeleton_factor(form_a.skeleton(), form_b.skeleton()),
            signature,
            signature_divergent: distance > self.config.max_signature_length_diff,
            identical: false,
        }
    }

    fn skeleton_factor(&self, a: &ControlSkeleton, b: &ControlSkeleton) -> f64 {
        let near_empty_a = a.statements <= self.config.max_empty_vs_populated;
        let near_empty_b = b.statements <= self.config.max_empty_vs_populated;
        if near_empty_a != near_empty_b {
            return 0.0;
        }
        skeleton_similarity(a, b)
    }

    /// Scale the structural factor down when the line-count ratio is too large.
    fn with_line_penalty(&self, mut factors: SimilarityFactors, lines_a: usize, lines_b: usize) -> SimilarityFactors {
        if factors.identical {
            return factors;
        }

        let shorter = lines_a.min(lines_b).max(1) as f64;
        let longer = lines_a.max(lines_b).max(1) as f64;
        let ratio = longer / shorter;
        if ratio > self.config.max_line_difference_ratio {
            factors.structural *= self.config.max_line_difference_ratio / ratio;
        }

        factors.structural = factors.structural.clamp(0.0, 1.0);
        factors
    }
}

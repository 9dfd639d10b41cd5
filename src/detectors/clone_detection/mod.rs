//! Structural duplicate detection.
//!
//! This module implements the similarity engine:
//! - Language-agnostic normalization and structural hashing
//! - Normalized tree edit distance over canonical trees
//! - Weighted multi-factor scoring with a concurrent pair cache
//! - Parallel all-pairs scheduling with progress reporting

pub mod cache;
pub mod normalization;
pub mod scheduler;
pub mod similarity;
pub mod tree_edit;

pub use cache::{pair_key, CacheStatistics, SimilarityCache};
pub use normalization::{
    extract_signature, ControlSkeleton, FunctionSignature, NormalizedForm, Normalizer,
    EMPTY_STRUCTURAL_HASH,
};
pub use scheduler::{
    candidate_pairs, total_pairs, ComparisonJob, ComparisonOutcome, ComparisonResult,
    ComparisonScheduler, Match, RunState, RunStatistics,
};
pub use similarity::{SimilarityDetector, SimilarityFactors};
pub use tree_edit::tree_edit_similarity;

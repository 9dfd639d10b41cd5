//! # Twinscan-RS: Structural Duplicate Function Detection
//!
//! Twinscan finds duplicate and near-duplicate functions across a codebase by
//! comparing normalized syntax trees with a weighted multi-factor similarity
//! score. The library covers:
//!
//! - **Normalization**: identifier/literal placeholders, control-flow skeletons,
//!   and content-addressed structural hashes
//! - **Similarity Detection**: tree edit distance, token overlap, structural and
//!   signature factors with a concurrent, order-independent result cache
//! - **Parallel Scheduling**: all-pairs comparison over a per-run worker pool
//!   with progress reporting and partial-failure aggregation
//! - **Weight Calibration**: grid search and a genetic optimizer scored by a
//!   statistical validator over a labeled validation suite
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  lang (tree-sitter)  →  FunctionDescriptor                 │
//! ├────────────────────────────────────────────────────────────┤
//! │  Normalizer  →  SimilarityDetector  →  ComparisonScheduler │
//! │                        ↑                                   │
//! │        calibration: Validator · GridSearch · Genetic       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use twinscan_rs::detectors::clone_detection::{ComparisonScheduler, SimilarityDetector};
//! use twinscan_rs::core::config::{DetectorConfig, SchedulerConfig};
//! use twinscan_rs::lang::registry::adapter_for_language;
//!
//! fn main() -> twinscan_rs::Result<()> {
//!     let mut adapter = adapter_for_language("go")?;
//!     let functions = adapter.extract_functions("package p\nfunc f() int { return 1 }", "p.go")?;
//!
//!     let detector = SimilarityDetector::new(DetectorConfig::default())?;
//!     let scheduler = ComparisonScheduler::new(detector, SchedulerConfig::default())?;
//!     let outcome = scheduler.find_similar(&functions, |done, total| {
//!         println!("{done}/{total}");
//!     });
//!
//!     println!("{} matches", outcome.matches.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core data structures, configuration and errors
pub mod core {
    //! Core data structures, configuration, and error handling.

    pub mod config;
    pub mod errors;
    pub mod function;
}

// Language-specific AST adapters
pub mod lang {
    //! Language-specific parsing into language-neutral syntax trees.

    pub mod common;
    pub mod go;
    pub mod registry;
    pub mod rust_lang;
}

// Similarity detection and calibration
pub mod detectors {
    //! Duplicate detection and weight calibration.

    pub mod calibration;
    pub mod clone_detection;
}

// Re-export primary types for convenience
pub use core::config::{DetectorConfig, SchedulerConfig, SimilarityWeights};
pub use core::errors::{Result, TwinscanError};
pub use core::function::FunctionDescriptor;
pub use detectors::clone_detection::{ComparisonScheduler, Match, SimilarityDetector};

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

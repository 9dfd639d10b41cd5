//! Similarity factor weights.
//!
//! The four primary weights blend the tree-edit, token, structural, and
//! signature factors and must sum to one. The fifth weight is the penalty
//! applied when two signatures diverge too far to be compared.

use serde::{Deserialize, Serialize};

use super::validation::{validate_positive_f64, validate_unit_range};
use crate::core::errors::{Result, TwinscanError};

/// Allowed deviation of the primary weight sum from 1.0
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

/// Floor applied to primary weights before renormalization
pub const MIN_PRIMARY_WEIGHT: f64 = 0.01;

/// Number of primary (blended) weights
pub const PRIMARY_WEIGHT_COUNT: usize = 4;

/// Weights for the multi-factor similarity score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    /// Weight of the normalized tree edit distance factor
    pub tree_edit: f64,

    /// Weight of the token stream overlap factor
    pub token_similarity: f64,

    /// Weight of the control-flow skeleton factor
    pub structural: f64,

    /// Weight of the parameter/return type factor
    pub signature: f64,

    /// Penalty in [0, 1] applied when signatures diverge
    pub different_signature_penalty: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            tree_edit: 0.30,
            token_similarity: 0.30,
            structural: 0.25,
            signature: 0.15,
            different_signature_penalty: 0.50,
        }
    }
}

impl SimilarityWeights {
    /// Build weights from the four primary values and the penalty.
    pub fn from_primary(primary: [f64; PRIMARY_WEIGHT_COUNT], penalty: f64) -> Self {
        Self {
            tree_edit: primary[0],
            token_similarity: primary[1],
            structural: primary[2],
            signature: primary[3],
            different_signature_penalty: penalty,
        }
    }

    /// The four primary weights in factor order
    pub fn primary(&self) -> [f64; PRIMARY_WEIGHT_COUNT] {
        [
            self.tree_edit,
            self.token_similarity,
            self.structural,
            self.signature,
        ]
    }

    /// Overwrite the four primary weights, keeping the penalty.
    pub fn set_primary(&mut self, primary: [f64; PRIMARY_WEIGHT_COUNT]) {
        self.tree_edit = primary[0];
        self.token_similarity = primary[1];
        self.structural = primary[2];
        self.signature = primary[3];
    }

    /// Sum of the four primary weights
    pub fn primary_sum(&self) -> f64 {
        self.primary().iter().sum()
    }

    /// Validate the weight invariants.
    pub fn validate(&self) -> Result<()> {
        let names = ["tree_edit", "token_similarity", "structural", "signature"];
        for (value, name) in self.primary().into_iter().zip(names) {
            validate_positive_f64(value, &format!("weights.{name}"))?;
        }

        let sum = self.primary_sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(TwinscanError::validation_field(
                "primary weights must sum to 1.0",
                "weights",
                "1.0",
                format!("{sum:.6}"),
            ));
        }

        validate_unit_range(
            self.different_signature_penalty,
            "weights.different_signature_penalty",
        )
    }

    /// Proportionally rescale the primary weights so they sum to one.
    ///
    /// Each primary weight is first floored at [`MIN_PRIMARY_WEIGHT`] so the
    /// result stays strictly positive; the penalty is clamped to [0, 1].
    pub fn normalized(&self) -> Self {
        let floored = self.primary().map(|w| {
            if w.is_finite() {
                w.max(MIN_PRIMARY_WEIGHT)
            } else {
                MIN_PRIMARY_WEIGHT
            }
        });
        let sum: f64 = floored.iter().sum();
        let penalty = if self.different_signature_penalty.is_finite() {
            self.different_signature_penalty.clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self::from_primary(floored.map(|w| w / sum), penalty)
    }
}

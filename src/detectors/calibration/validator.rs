//! Statistical validation of weight vectors against a labeled suite.
//!
//! Every case is parsed once and its weight-independent factors are
//! precomputed, both for the original pair and for a few synthetic
//! perturbations of the second function. Scoring a weight vector is then a
//! cheap re-combination over cached factors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::{debug, info};

use super::suite::{ValidationCategory, ValidationSuite};
use crate::core::config::{DetectorConfig, SimilarityWeights, ValidatorConfig};
use crate::core::errors::{Result, TwinscanError};
use crate::core::function::{FunctionDescriptor, NodeRole, SyntaxNode};
use crate::detectors::clone_detection::{SimilarityDetector, SimilarityFactors};
use crate::lang::common::LanguageAdapter;
use crate::lang::go::GoAdapter;

/// Suffix appended to identifiers by the rename perturbation
const RENAME_SUFFIX: &str = "_alt";

/// Agreement metrics for one weight vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    /// Mean absolute error
    pub mae: f64,
    /// Mean squared error
    pub mse: f64,
    /// Coefficient of determination (0 when expected values have no variance)
    pub r_squared: f64,
    /// F1 of the thresholded duplicate decision
    pub f1: f64,
    /// Accuracy of the thresholded duplicate decision
    pub accuracy: f64,
    /// Precision of the thresholded duplicate decision
    pub precision: f64,
    /// Recall of the thresholded duplicate decision
    pub recall: f64,
    /// Score stability under perturbations, 1 is perfectly stable
    pub robustness: f64,
    /// `0.4·(1−MAE) + 0.3·max(R², 0) + 0.3·F1`
    pub composite: f64,
    /// MAE per case category
    pub category_mae: BTreeMap<ValidationCategory, f64>,
}

#[derive(Debug, Clone)]
struct PreparedCase {
    name: String,
    category: ValidationCategory,
    expected: f64,
    factors: SimilarityFactors,
    perturbed: Vec<SimilarityFactors>,
}

/// Scores weight vectors against a validation suite
#[derive(Debug)]
pub struct StatisticalValidator {
    config: ValidatorConfig,
    cases: Vec<PreparedCase>,
}

impl StatisticalValidator {
    /// Prepare a validator using the default detector settings.
    pub fn new(suite: ValidationSuite, config: ValidatorConfig) -> Result<Self> {
        Self::with_detector_config(suite, config, DetectorConfig::default())
    }

    /// Prepare a validator with explicit detector settings.
    ///
    /// Only the non-weight settings matter here (line ratio, empty guard,
    /// signature distance); weights are supplied per [`Self::validate`] call.
    pub fn with_detector_config(
        suite: ValidationSuite,
        config: ValidatorConfig,
        detector_config: DetectorConfig,
    ) -> Result<Self> {
        config.validate()?;
        if suite.is_empty() {
            return Err(TwinscanError::calibration("validation suite has no cases"));
        }

        let detector = SimilarityDetector::new(detector_config)?;
        let mut adapter = GoAdapter::new()?;
        let mut cases = Vec::with_capacity(suite.len());

        for case in suite.cases() {
            if !(0.0..=1.0).contains(&case.expected) {
                return Err(TwinscanError::calibration(format!(
                    "case '{}' expects {} outside [0, 1]",
                    case.name, case.expected
                )));
            }

            let a = parse_single(&mut adapter, &case.source_a, &case.name, "a")?;
            let b = parse_single(&mut adapter, &case.source_b, &case.name, "b")?;

            let factors = detector.factors(&a, &b);
            let perturbed = perturbations(&b, config.perturbation_line_stretch)
                .iter()
                .map(|variant| detector.factors(&a, variant))
                .collect();

            cases.push(PreparedCase {
                name: case.name.clone(),
                category: case.category,
                expected: case.expected,
                factors,
                perturbed,
            });
        }

        info!("Prepared {} validation cases", cases.len());
        Ok(Self { config, cases })
    }

    /// Number of prepared cases
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Validator configuration
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Predicted similarity per case, in suite order
    pub fn predictions(&self, weights: &SimilarityWeights) -> Vec<(String, f64)> {
        self.cases
            .iter()
            .map(|case| (case.name.clone(), case.factors.combine(weights)))
            .collect()
    }

    /// Evaluate a weight vector over the suite.
    pub fn validate(&self, weights: &SimilarityWeights) -> ValidationMetrics {
        let threshold = self.config.duplicate_threshold;
        let n = self.cases.len() as f64;

        let predicted: Vec<f64> = self.cases.iter().map(|c| c.factors.combine(weights)).collect();
        let expected: Vec<f64> = self.cases.iter().map(|c| c.expected).collect();

        let abs_errors: Vec<f64> = predicted
            .iter()
            .zip(&expected)
            .map(|(p, e)| (p - e).abs())
            .collect();
        let mae = abs_errors.iter().mean();
        let mse = abs_errors.iter().map(|e| e * e).mean();

        let expected_mean = expected.iter().mean();
        let total_variation: f64 = expected.iter().map(|e| (e - expected_mean).powi(2)).sum();
        let residual: f64 = abs_errors.iter().map(|e| e * e).sum();
        let r_squared = if total_variation <= f64::EPSILON {
            0.0
        } else {
            1.0 - residual / total_variation
        };

        let (mut tp, mut fp, mut fn_, mut tn) = (0usize, 0usize, 0usize, 0usize);
        for (p, e) in predicted.iter().zip(&expected) {
            match (*p >= threshold, *e >= threshold) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, true) => fn_ += 1,
                (false, false) => tn += 1,
            }
        }
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        let accuracy = (tp + tn) as f64 / n;

        let robustness = self.robustness(weights, &predicted);

        let mut per_category: BTreeMap<ValidationCategory, Vec<f64>> = BTreeMap::new();
        for (case, error) in self.cases.iter().zip(&abs_errors) {
            per_category.entry(case.category).or_default().push(*error);
        }
        let category_mae = per_category
            .into_iter()
            .map(|(category, errors)| (category, errors.iter().mean()))
            .collect();

        let composite = composite_score(mae, r_squared, f1);

        debug!(
            "Validated weights {:?}: mae={:.4} r2={:.4} f1={:.4} composite={:.4}",
            weights, mae, r_squared, f1, composite
        );

        ValidationMetrics {
            mae,
            mse,
            r_squared,
            f1,
            accuracy,
            precision,
            recall,
            robustness,
            composite,
            category_mae,
        }
    }

    /// `1 - mean(stddev)` of each case's score across its perturbations.
    fn robustness(&self, weights: &SimilarityWeights, predicted: &[f64]) -> f64 {
        let deviations: Vec<f64> = self
            .cases
            .iter()
            .zip(predicted)
            .map(|(case, original)| {
                let mut scores = Vec::with_capacity(case.perturbed.len() + 1);
                scores.push(*original);
                scores.extend(case.perturbed.iter().map(|f| f.combine(weights)));
                scores.iter().population_std_dev()
            })
            .collect();

        (1.0 - deviations.iter().mean()).clamp(0.0, 1.0)
    }
}

/// Composite agreement score in [0, 1]
pub fn composite_score(mae: f64, r_squared: f64, f1: f64) -> f64 {
    let value = 0.4 * (1.0 - mae) + 0.3 * r_squared.max(0.0) + 0.3 * f1;
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn parse_single(
    adapter: &mut GoAdapter,
    source: &str,
    case_name: &str,
    side: &str,
) -> Result<FunctionDescriptor> {
    let wrapped = if source.trim_start().starts_with("package") {
        source.to_string()
    } else {
        format!("package validation\n\n{source}\n")
    };

    let path = format!("{case_name}_{side}.go");
    adapter
        .extract_functions(&wrapped, &path)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            TwinscanError::calibration(format!(
                "case '{case_name}' side {side} does not contain a function"
            ))
        })
}

/// Identifier rename, comment insertion, and line stretch variants.
fn perturbations(descriptor: &FunctionDescriptor, line_stretch: usize) -> Vec<FunctionDescriptor> {
    let tree = descriptor.syntax_tree();

    let renamed = rename_identifiers(tree);
    let commented = insert_comment(tree);

    vec![
        rebuild(descriptor, renamed, 0),
        rebuild(descriptor, commented, 1),
        rebuild(descriptor, tree.clone(), line_stretch),
    ]
}

fn rebuild(descriptor: &FunctionDescriptor, tree: SyntaxNode, extra_lines: usize) -> FunctionDescriptor {
    FunctionDescriptor::new(
        descriptor.name(),
        descriptor.file_path(),
        descriptor.start_line(),
        descriptor.end_line() + extra_lines,
        tree,
    )
}

fn rename_identifiers(node: &SyntaxNode) -> SyntaxNode {
    let mut renamed = node.clone();
    rename_in_place(&mut renamed);
    renamed
}

fn rename_in_place(node: &mut SyntaxNode) {
    if matches!(node.role, NodeRole::Identifier | NodeRole::Name) {
        if let Some(text) = node.text.as_mut() {
            text.push_str(RENAME_SUFFIX);
        }
    }
    for child in &mut node.children {
        rename_in_place(child);
    }
}

fn insert_comment(node: &SyntaxNode) -> SyntaxNode {
    let mut commented = node.clone();
    if let Some(body) = commented
        .children
        .iter_mut()
        .find(|c| c.role == NodeRole::Block)
    {
        body.children.insert(
            0,
            SyntaxNode::leaf("comment", NodeRole::Comment, "// perturbation"),
        );
    }
    commented
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::calibration::suite::ValidationCase;
    use approx::assert_relative_eq;

    fn validator() -> StatisticalValidator {
        StatisticalValidator::new(ValidationSuite::builtin(), ValidatorConfig::default())
            .expect("builtin suite prepares")
    }

    #[test]
    fn builtin_suite_is_prepared() {
        let validator = validator();
        assert_eq!(validator.case_count(), ValidationSuite::builtin().len());
    }

    #[test]
    fn metrics_are_within_bounds() {
        let metrics = validator().validate(&SimilarityWeights::default());
        for value in [
            metrics.mae,
            metrics.mse,
            metrics.f1,
            metrics.accuracy,
            metrics.precision,
            metrics.recall,
            metrics.robustness,
            metrics.composite,
        ] {
            assert!((0.0..=1.0).contains(&value), "metric out of range: {value}");
        }
        assert!(metrics.r_squared <= 1.0);
        assert_eq!(metrics.category_mae.len(), 8);
        assert!(metrics.mse <= metrics.mae + 1e-12);
    }

    #[test]
    fn exact_duplicates_have_no_error() {
        let metrics = validator().validate(&SimilarityWeights::default());
        assert_relative_eq!(metrics.category_mae[&ValidationCategory::Identical], 0.0);
        assert_relative_eq!(metrics.category_mae[&ValidationCategory::Renamed], 0.0);
        assert_relative_eq!(metrics.category_mae[&ValidationCategory::Reformatted], 0.0);
    }

    #[test]
    fn zero_variance_suite_reports_zero_r_squared() {
        let source = "func one() int {\n\tx := 1\n\treturn x\n}";
        let suite = ValidationSuite::new(vec![
            ValidationCase::new("a", ValidationCategory::Identical, source, source, 1.0),
            ValidationCase::new("b", ValidationCategory::Identical, source, source, 1.0),
        ]);
        let validator = StatisticalValidator::new(suite, ValidatorConfig::default()).unwrap();
        let metrics = validator.validate(&SimilarityWeights::default());

        assert_eq!(metrics.r_squared, 0.0);
        assert_eq!(metrics.mae, 0.0);
        assert_eq!(metrics.f1, 1.0);
        assert_relative_eq!(metrics.composite, 0.7, epsilon = 1e-12);
    }

    #[test]
    fn rename_perturbation_preserves_structure() {
        let mut adapter = GoAdapter::new().unwrap();
        let original = parse_single(
            &mut adapter,
            "func f(a int) int {\n\tb := a + 1\n\treturn b\n}",
            "t",
            "a",
        )
        .unwrap();
        let variants = perturbations(&original, 3);

        assert_eq!(variants.len(), 3);
        assert_eq!(variants[0].structural_hash(), original.structural_hash());
        assert_eq!(variants[1].structural_hash(), original.structural_hash());
        assert_eq!(variants[2].line_count(), original.line_count() + 3);
        assert_ne!(variants[0].syntax_tree(), original.syntax_tree());
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        assert!(StatisticalValidator::new(ValidationSuite::default(), ValidatorConfig::default()).is_err());

        let suite = ValidationSuite::new(vec![ValidationCase::new(
            "bad",
            ValidationCategory::Identical,
            "func a() {}",
            "func a() {}",
            1.5,
        )]);
        assert!(StatisticalValidator::new(suite, ValidatorConfig::default()).is_err());

        let suite = ValidationSuite::new(vec![ValidationCase::new(
            "empty",
            ValidationCategory::Identical,
            "var x = 1",
            "func a() {}",
            1.0,
        )]);
        let err = StatisticalValidator::new(suite, ValidatorConfig::default()).unwrap_err();
        assert!(matches!(err, TwinscanError::Calibration { .. }));
    }

    #[test]
    fn composite_score_clamps() {
        assert_relative_eq!(composite_score(0.0, 1.0, 1.0), 1.0);
        assert_relative_eq!(composite_score(1.0, -3.0, 0.0), 0.0);
        assert_eq!(composite_score(f64::NAN, 0.0, 0.0), 0.0);
    }
}

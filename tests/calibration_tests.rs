//! Weight calibration against the built-in validation suite.

use approx::assert_relative_eq;
use twinscan_rs::core::config::{GeneticConfig, GridSearchConfig, ValidatorConfig};
use twinscan_rs::detectors::calibration::{
    calibrate, GeneticOptimizer, GridSearch, StatisticalValidator, ValidationCase,
    ValidationCategory, ValidationSuite,
};
use twinscan_rs::SimilarityWeights;

fn builtin_validator() -> StatisticalValidator {
    StatisticalValidator::new(ValidationSuite::builtin(), ValidatorConfig::default())
        .expect("builtin suite parses")
}

#[test]
fn default_weights_separate_duplicates_from_unrelated_code() {
    let validator = builtin_validator();
    let metrics = validator.validate(&SimilarityWeights::default());

    assert!(metrics.mae < 0.3, "mae {}", metrics.mae);
    assert!((0.0..=1.0).contains(&metrics.composite));
    assert!((0.0..=1.0).contains(&metrics.robustness));

    let predictions = validator.predictions(&SimilarityWeights::default());
    let score = |name: &str| {
        predictions
            .iter()
            .find(|(case, _)| case == name)
            .map(|(_, score)| *score)
            .unwrap_or_else(|| panic!("missing case {name}"))
    };
    assert_eq!(score("renamed_sum"), 1.0);
    assert!(score("sum_vs_sort") < 0.3);
}

#[test]
fn grid_search_never_loses_to_baseline() {
    let validator = builtin_validator();
    let baseline = SimilarityWeights::default();
    let baseline_score = validator.validate(&baseline).composite;

    let search = GridSearch::new(GridSearchConfig {
        step: 0.25,
        penalty_values: vec![0.25, 0.5, 0.75],
        include_baseline: true,
    })
    .expect("grid config");
    let result = search.run(&validator, &baseline).expect("grid search");

    // One composition of four units into four positive parts, three penalties, plus baseline.
    assert_eq!(result.iterations, 4);
    assert!(result.best_score() >= baseline_score);
    assert_relative_eq!(result.best_weights.primary_sum(), 1.0, epsilon = 1e-9);
}

#[test]
fn genetic_optimizer_converges_within_budget() {
    let validator = builtin_validator();
    let config = GeneticConfig {
        population_size: 30,
        generations: 50,
        ..GeneticConfig::default()
    }
    .with_seed(42);

    let result = GeneticOptimizer::new(config)
        .expect("genetic config")
        .run(&validator, &SimilarityWeights::default())
        .expect("genetic run");

    assert!(result.convergence_generation >= 1 && result.convergence_generation <= 50);
    assert!(result.best.fitness >= 0.0);
    assert!(result.best.weights.validate().is_ok());
    assert_eq!(result.history.len(), 50);
    assert_eq!(result.evaluations, 30 * 50);

    let baseline_score = validator.validate(&SimilarityWeights::default()).composite;
    assert!(result.best.fitness >= baseline_score - 1e-9);
}

#[test]
fn calibration_report_recommends_best_vector() {
    let validator = builtin_validator();
    let report = calibrate(
        &validator,
        &SimilarityWeights::default(),
        GridSearchConfig {
            step: 0.2,
            penalty_values: vec![0.5],
            include_baseline: true,
        },
        GeneticConfig {
            population_size: 10,
            generations: 5,
            ..GeneticConfig::default()
        }
        .with_seed(3),
    )
    .expect("calibration");

    let best = report
        .grid
        .best_score()
        .max(report.genetic.best_metrics.composite)
        .max(report.baseline_metrics.composite);
    assert_relative_eq!(report.recommended_score, best);
    assert!(report.improvement() >= 0.0);

    let json = serde_json::to_string(&report).expect("report serializes");
    assert!(json.contains("\"recommended\""));
}

#[test]
fn unparseable_case_is_rejected_at_setup() {
    let suite = ValidationSuite::new(vec![ValidationCase::new(
        "broken",
        ValidationCategory::Identical,
        "this is not go",
        "func ok() {}",
        1.0,
    )]);
    assert!(StatisticalValidator::new(suite, ValidatorConfig::default()).is_err());
}

//! Integration tests for the comparison engine

mod common;

use common::*;
use polars::prelude::*;
use staylift::compare::{
    narrate, Comparison, ComparisonEngine, ComparisonSpec, CompareError, AGGREGATE_COMMENTARY,
    NO_FINDINGS,
};
use staylift::pipeline::{builtin_stages, run_pipeline, FeatureParams, FEATURE_TABLE};

fn single(column: &str, a: &str, b: &str) -> ComparisonSpec {
    ComparisonSpec::new(vec![Comparison::new(column, a, b, "Feature")])
}

/// `n_zero` zeros followed by `n_high` copies of `high`
fn repeated(n_zero: usize, n_high: usize, high: f64) -> Vec<f64> {
    std::iter::repeat(0.0)
        .take(n_zero)
        .chain(std::iter::repeat(high).take(n_high))
        .collect()
}

#[test]
fn test_ten_percent_lift_is_not_significant() {
    // flexible: n = 500, mean 12.0; strict: n = 450, mean 13.2
    let mut policy = vec!["flexible"; 500];
    policy.extend(vec!["strict"; 450]);
    let mut reviews = repeated(250, 250, 24.0);
    reviews.extend(repeated(225, 225, 26.4));
    let df = df! {
        "cancellation_policy" => policy,
        "number_of_reviews" => reviews,
    }
    .unwrap();

    let report = ComparisonEngine::new("number_of_reviews")
        .evaluate(&df, &single("cancellation_policy", "flexible", "strict"))
        .unwrap();
    let result = &report.results[0];

    assert_eq!(result.group_a.count, 500);
    assert_eq!(result.group_b.count, 450);
    assert!((result.group_a.mean.unwrap() - 12.0).abs() < 1e-9);
    assert!((result.group_b.mean.unwrap() - 13.2).abs() < 1e-9);
    assert!((result.lift_pct.unwrap() - 10.0).abs() < 1e-9);
    // Reference: t = 1.4588, df = 911.52, p = 0.14496
    assert!((result.t_statistic.unwrap() - 1.4588).abs() < 1e-3);
    assert!((result.p_value.unwrap() - 0.14496).abs() < 1e-3);
    assert_eq!(result.significant, Some(false));

    assert_eq!(narrate(&report), vec![NO_FINDINGS.to_string()]);
}

#[test]
fn test_zero_baseline_mean_leaves_lift_undefined() {
    let df = df! {
        "room_type" => ["Shared room", "Shared room", "Shared room", "Private room", "Private room", "Private room"],
        "number_of_reviews" => [0.0f64, 0.0, 0.0, 4.0, 5.0, 6.0],
    }
    .unwrap();
    let report = ComparisonEngine::default()
        .evaluate(&df, &single("room_type", "Shared room", "Private room"))
        .unwrap();
    let result = &report.results[0];

    assert_eq!(result.lift_pct, None);
    assert_eq!(result.group_a.mean, Some(0.0));
    assert!(result.p_value.is_some());
}

#[test]
fn test_small_group_keeps_row_without_p_value() {
    let df = df! {
        "room_type" => ["Hotel room", "Private room", "Private room", "Private room"],
        "number_of_reviews" => [3.0f64, 4.0, 5.0, 6.0],
    }
    .unwrap();
    let report = ComparisonEngine::default()
        .evaluate(&df, &single("room_type", "Hotel room", "Private room"))
        .unwrap();

    assert_eq!(report.results.len(), 1);
    let result = &report.results[0];
    assert_eq!(result.group_a.count, 1);
    assert_eq!(result.p_value, None);
    assert_eq!(result.significant, None);
    assert!(!result.is_significant());
    assert!((result.lift_pct.unwrap() - 66.666_666_666).abs() < 1e-6);
}

#[test]
fn test_missing_outcomes_are_ignored() {
    let df = df! {
        "room_type" => ["A", "A", "A", "B", "B", "B"],
        "number_of_reviews" => [Some(1.0f64), None, Some(3.0), Some(f64::NAN), Some(6.0), Some(8.0)],
    }
    .unwrap();
    let report = ComparisonEngine::default()
        .evaluate(&df, &single("room_type", "A", "B"))
        .unwrap();
    let result = &report.results[0];
    assert_eq!(result.group_a.count, 2);
    assert_eq!(result.group_b.count, 2);
    assert_eq!(result.group_a.mean, Some(2.0));
    assert_eq!(result.group_b.mean, Some(7.0));
}

#[test]
fn test_absent_labels_are_omitted() {
    let df = df! {
        "neighbourhood_group" => ["Queens", "Bronx", "Queens", "Bronx"],
        "number_of_reviews" => [1.0f64, 2.0, 3.0, 4.0],
    }
    .unwrap();
    let spec = ComparisonSpec::new(vec![
        Comparison::new("neighbourhood_group", "Brooklyn", "Manhattan", "Borough"),
        Comparison::new("neighbourhood_group", "Queens", "Manhattan", "Queens vs Manhattan"),
        Comparison::new("host_type", "solo", "company", "Host"),
    ]);
    let report = ComparisonEngine::default().evaluate(&df, &spec).unwrap();

    assert!(report.results.is_empty());
    assert_eq!(report.omitted.len(), 3);
    assert_eq!(report.omitted[0].missing_labels, vec!["Brooklyn", "Manhattan"]);
    assert_eq!(report.omitted[1].missing_labels, vec!["Manhattan"]);
    assert!(!report.omitted[1].column_missing);
    assert!(report.omitted[2].column_missing);
}

#[test]
fn test_results_ranked_by_p_value_with_undefined_last() {
    let df = df! {
        "strong" => ["a", "a", "a", "a", "b", "b", "b", "b"],
        "weak" => ["a", "b", "a", "b", "a", "b", "a", "b"],
        "tiny" => ["a", "b", "b", "b", "b", "b", "b", "b"],
        "number_of_reviews" => [1.0f64, 2.0, 1.5, 2.5, 10.0, 11.0, 10.5, 11.5],
    }
    .unwrap();
    let spec = ComparisonSpec::new(vec![
        Comparison::new("tiny", "a", "b", "Tiny"),
        Comparison::new("weak", "a", "b", "Weak"),
        Comparison::new("strong", "a", "b", "Strong"),
    ]);
    let report = ComparisonEngine::default().evaluate(&df, &spec).unwrap();

    let order: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, vec!["Strong", "Weak", "Tiny"]);
    assert!(report.results[0].is_significant());
    assert_eq!(report.results[2].p_value, None);

    let narrative = narrate(&report);
    assert_eq!(narrative.len(), 2);
    assert!(narrative[0].starts_with("Strong: 'b' listings get"));
    assert!(narrative[0].contains("more reviews"));
    assert_eq!(narrative[1], AGGREGATE_COMMENTARY);
}

#[test]
fn test_evaluation_is_deterministic() {
    let df = create_feature_dataframe(600);
    let spec = ComparisonSpec::listing_defaults();
    let engine = ComparisonEngine::default();

    let first = engine.evaluate(&df, &spec).unwrap();
    let second = engine.evaluate(&df, &spec).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.results.len() + first.omitted.len(), spec.len());
}

#[test]
fn test_outcome_errors() {
    let df = create_feature_dataframe(10);
    let spec = ComparisonSpec::listing_defaults();

    assert!(matches!(
        ComparisonEngine::new("revenue").evaluate(&df, &spec),
        Err(CompareError::OutcomeNotFound(_))
    ));
    assert!(matches!(
        ComparisonEngine::new("room_type").evaluate(&df, &spec),
        Err(CompareError::OutcomeNotNumeric { .. })
    ));
}

#[test]
fn test_integer_outcome_column() {
    let df = df! {
        "room_type" => ["A", "A", "B", "B"],
        "number_of_reviews" => [1i64, 3, 5, 7],
    }
    .unwrap();
    let report = ComparisonEngine::default()
        .evaluate(&df, &single("room_type", "A", "B"))
        .unwrap();
    assert!((report.results[0].lift_pct.unwrap() - 200.0).abs() < 1e-9);
}

#[test]
fn test_report_to_dataframe() {
    let df = create_feature_dataframe(120);
    let report = ComparisonEngine::default()
        .evaluate(&df, &ComparisonSpec::listing_defaults())
        .unwrap();
    let table = report.to_dataframe().unwrap();

    assert_eq!(table.height(), report.results.len());
    assert_has_columns(
        &table,
        &["feature", "label_a", "mean_a", "n_a", "label_b", "mean_b", "n_b", "lift_pct", "p_value", "significant"],
    );
}

#[test]
fn test_comparison_spec_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comparisons.json");
    std::fs::write(
        &path,
        r#"[{"column": "room_type", "label_a": "Private room", "label_b": "Shared room", "name": "Room"}]"#,
    )
    .unwrap();
    let spec = ComparisonSpec::from_json_file(&path).unwrap();
    assert_eq!(spec.len(), 1);

    std::fs::write(&path, "{}").unwrap();
    assert!(matches!(
        ComparisonSpec::from_json_file(&path),
        Err(CompareError::SpecParse { .. })
    ));
    assert!(matches!(
        ComparisonSpec::from_json_file(&dir.path().join("absent.json")),
        Err(CompareError::SpecIo { .. })
    ));
}

#[test]
fn test_defaults_against_pipeline_output() {
    let mut store = create_loaded_store();
    run_pipeline(&mut store, &builtin_stages(&FeatureParams::default())).unwrap();
    let features = store.table(FEATURE_TABLE).unwrap();

    let report = ComparisonEngine::default()
        .evaluate(features, &ComparisonSpec::listing_defaults())
        .unwrap();

    // every default pair occurs in the fixture
    assert!(report.omitted.is_empty(), "omitted: {:?}", report.omitted);
    assert_eq!(report.results.len(), 6);
    let bookable = report
        .results
        .iter()
        .find(|r| r.column == "instant_bookable")
        .unwrap();
    assert_eq!(bookable.group_a.count, 4);
    assert_eq!(bookable.group_b.count, 4);
}

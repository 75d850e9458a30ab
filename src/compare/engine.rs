//! Pairwise category comparison engine
//!
//! For every [`Comparison`] the engine splits the rows matching either label
//! into two groups, summarises the outcome column per group and runs a Welch
//! test. Per-comparison problems (tiny groups, zero baseline mean) only leave
//! that row's fields undefined; they never abort the batch.

use std::cmp::Ordering;

use polars::prelude::*;
use serde::Serialize;

use super::spec::{Comparison, ComparisonSpec};
use super::welch::{welch_t_test, SampleSummary};
use super::CompareError;

/// p-values strictly below this are significant
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Default outcome column of the listing feature table
pub const DEFAULT_OUTCOME: &str = "number_of_reviews";

/// Outcome summary of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub label: String,
    /// Rows with a present outcome
    pub count: usize,
    /// `None` when the group has no present outcomes
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub name: String,
    pub column: String,
    pub group_a: GroupStats,
    pub group_b: GroupStats,
    /// Percent change from A's mean to B's mean; `None` when A's mean is 0 or missing
    pub lift_pct: Option<f64>,
    pub t_statistic: Option<f64>,
    pub degrees_of_freedom: Option<f64>,
    pub p_value: Option<f64>,
    /// `None` when no p-value could be computed
    pub significant: Option<bool>,
}

impl ComparisonResult {
    /// Undefined significance counts as not significant
    pub fn is_significant(&self) -> bool {
        self.significant == Some(true)
    }
}

/// A comparison left out of the results because a label never occurs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmittedComparison {
    pub comparison: Comparison,
    pub missing_labels: Vec<String>,
    /// The feature column itself is absent from the table
    pub column_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub outcome: String,
    /// Sorted by p-value ascending, undefined p-values last
    pub results: Vec<ComparisonResult>,
    pub omitted: Vec<OmittedComparison>,
}

impl ComparisonReport {
    pub fn significant(&self) -> impl Iterator<Item = &ComparisonResult> {
        self.results.iter().filter(|r| r.is_significant())
    }

    /// One row per result, for writing to the store
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let r = &self.results;
        df! {
            "feature" => r.iter().map(|x| x.name.clone()).collect::<Vec<_>>(),
            "column" => r.iter().map(|x| x.column.clone()).collect::<Vec<_>>(),
            "label_a" => r.iter().map(|x| x.group_a.label.clone()).collect::<Vec<_>>(),
            "mean_a" => r.iter().map(|x| x.group_a.mean).collect::<Vec<_>>(),
            "n_a" => r.iter().map(|x| x.group_a.count as u64).collect::<Vec<_>>(),
            "label_b" => r.iter().map(|x| x.group_b.label.clone()).collect::<Vec<_>>(),
            "mean_b" => r.iter().map(|x| x.group_b.mean).collect::<Vec<_>>(),
            "n_b" => r.iter().map(|x| x.group_b.count as u64).collect::<Vec<_>>(),
            "lift_pct" => r.iter().map(|x| x.lift_pct).collect::<Vec<_>>(),
            "p_value" => r.iter().map(|x| x.p_value).collect::<Vec<_>>(),
            "significant" => r.iter().map(|x| x.significant).collect::<Vec<_>>(),
        }
    }
}

/// Evaluates a [`ComparisonSpec`] against one numeric outcome column
#[derive(Debug, Clone)]
pub struct ComparisonEngine {
    outcome: String,
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::new(DEFAULT_OUTCOME)
    }
}

impl ComparisonEngine {
    pub fn new(outcome: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
        }
    }

    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    /// Evaluate every comparison in order, then rank by p-value
    pub fn evaluate(
        &self,
        df: &DataFrame,
        spec: &ComparisonSpec,
    ) -> Result<ComparisonReport, CompareError> {
        let outcome = self.outcome_values(df)?;
        let mut results = Vec::with_capacity(spec.len());
        let mut omitted = Vec::new();

        for comparison in spec {
            let Ok(column) = df.column(&comparison.column) else {
                omitted.push(OmittedComparison {
                    comparison: comparison.clone(),
                    missing_labels: vec![comparison.label_a.clone(), comparison.label_b.clone()],
                    column_missing: true,
                });
                continue;
            };

            let text = column.cast(&DataType::String)?;
            let labels = text.as_materialized_series().str()?;

            let mut group_a = SampleSummary::default();
            let mut group_b = SampleSummary::default();
            let mut seen_a = false;
            let mut seen_b = false;

            for (label, value) in labels.iter().zip(outcome.iter()) {
                let Some(label) = label else {
                    continue;
                };
                if label == comparison.label_a {
                    seen_a = true;
                    if let Some(v) = value {
                        group_a.push(*v);
                    }
                }
                if label == comparison.label_b {
                    seen_b = true;
                    if let Some(v) = value {
                        group_b.push(*v);
                    }
                }
            }

            if !seen_a || !seen_b {
                let mut missing_labels = Vec::new();
                if !seen_a {
                    missing_labels.push(comparison.label_a.clone());
                }
                if !seen_b {
                    missing_labels.push(comparison.label_b.clone());
                }
                omitted.push(OmittedComparison {
                    comparison: comparison.clone(),
                    missing_labels,
                    column_missing: false,
                });
                continue;
            }

            results.push(summarise(comparison, &group_a, &group_b));
        }

        // Stable sort: ties keep input order
        results.sort_by(|a, b| compare_p_values(a.p_value, b.p_value));

        Ok(ComparisonReport {
            outcome: self.outcome.clone(),
            results,
            omitted,
        })
    }

    /// Outcome values with nulls and non-finite numbers treated as missing
    fn outcome_values(&self, df: &DataFrame) -> Result<Vec<Option<f64>>, CompareError> {
        let column = df
            .column(&self.outcome)
            .map_err(|_| CompareError::OutcomeNotFound(self.outcome.clone()))?;
        let dtype = column.dtype();
        if !dtype.is_primitive_numeric() {
            return Err(CompareError::OutcomeNotNumeric {
                column: self.outcome.clone(),
                dtype: dtype.to_string(),
            });
        }

        let values = column.cast(&DataType::Float64)?;
        let values = values
            .as_materialized_series()
            .f64()?
            .iter()
            .map(|v| v.filter(|x| x.is_finite()))
            .collect();
        Ok(values)
    }
}

/// `(mean_b - mean_a) / mean_a * 100`, undefined when `mean_a` is 0 or missing
pub fn lift_pct(mean_a: Option<f64>, mean_b: Option<f64>) -> Option<f64> {
    match (mean_a, mean_b) {
        (Some(a), Some(b)) if a != 0.0 => Some((b - a) / a * 100.0),
        _ => None,
    }
}

fn summarise(comparison: &Comparison, a: &SampleSummary, b: &SampleSummary) -> ComparisonResult {
    let test = welch_t_test(a, b);
    let p_value = test.map(|t| t.p_value);

    ComparisonResult {
        name: comparison.name.clone(),
        column: comparison.column.clone(),
        group_a: GroupStats {
            label: comparison.label_a.clone(),
            count: a.count(),
            mean: a.mean(),
        },
        group_b: GroupStats {
            label: comparison.label_b.clone(),
            count: b.count(),
            mean: b.mean(),
        },
        lift_pct: lift_pct(a.mean(), b.mean()),
        t_statistic: test.map(|t| t.t_statistic),
        degrees_of_freedom: test.map(|t| t.degrees_of_freedom),
        p_value,
        significant: p_value.map(|p| p < SIGNIFICANCE_LEVEL),
    }
}

/// Ascending, with undefined p-values after every defined one
fn compare_p_values(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

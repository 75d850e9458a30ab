//! Plain-text summary of a comparison report

use super::engine::{ComparisonReport, ComparisonResult};

/// Closing sentence after the per-feature findings
pub const AGGREGATE_COMMENTARY: &str = "Across the features tested, listing type and \
    booking conditions tend to matter more for engagement than location, and the \
    figures above are associations rather than causal effects.";

/// Sole sentence when no comparison reaches significance
pub const NO_FINDINGS: &str =
    "No significant differences were found between the compared groups at the 5% level.";

/// One sentence per significant result in report order, then the aggregate
/// commentary. A report without significant results yields [`NO_FINDINGS`].
pub fn narrate(report: &ComparisonReport) -> Vec<String> {
    let noun = outcome_noun(&report.outcome);
    let mut lines: Vec<String> = report
        .significant()
        .map(|result| sentence(result, &noun))
        .collect();

    if lines.is_empty() {
        lines.push(NO_FINDINGS.to_string());
    } else {
        lines.push(AGGREGATE_COMMENTARY.to_string());
    }
    lines
}

/// `number_of_reviews` -> `reviews`
fn outcome_noun(outcome: &str) -> String {
    outcome
        .strip_prefix("number_of_")
        .unwrap_or(outcome)
        .replace('_', " ")
}

fn sentence(result: &ComparisonResult, noun: &str) -> String {
    let a = &result.group_a.label;
    let b = &result.group_b.label;
    let p = format_p_value(result.p_value.unwrap_or(0.0));

    match result.lift_pct {
        Some(lift) => {
            let direction = if lift >= 0.0 { "more" } else { "fewer" };
            format!(
                "{}: '{}' listings get {:.1}% {} {} on average than '{}' listings ({}).",
                result.name,
                b,
                lift.abs(),
                direction,
                noun,
                a,
                p
            )
        }
        None => {
            let direction = match (result.group_a.mean, result.group_b.mean) {
                (Some(ma), Some(mb)) if mb < ma => "fewer",
                _ => "more",
            };
            format!(
                "{}: '{}' listings get {} {} on average than '{}' listings, \
                 whose average is zero ({}).",
                result.name, b, direction, noun, a, p
            )
        }
    }
}

fn format_p_value(p: f64) -> String {
    if p < 1e-4 {
        "p < 0.0001".to_string()
    } else {
        format!("p = {:.4}", p)
    }
}

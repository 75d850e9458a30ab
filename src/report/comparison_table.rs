//! Terminal rendering of a comparison report

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use console::style;

use crate::compare::{ComparisonReport, ComparisonResult, OmittedComparison};

/// Print the ranked results table followed by the narrative lines
pub fn display_comparison(report: &ComparisonReport, narrative: &[String]) {
    println!();
    println!(
        "    {} {}",
        style("📊").cyan(),
        style(format!("COMPARISONS ON {}", report.outcome.to_uppercase()))
            .white()
            .bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    if report.results.is_empty() {
        println!("      {}", style("No comparisons could be evaluated").dim());
    } else {
        for line in comparison_table(report).to_string().lines() {
            println!("    {}", line);
        }
    }

    println!();
    println!(
        "    {} {}",
        style("📝").cyan(),
        style("FINDINGS").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    for line in narrative {
        println!("      {} {}", style("•").dim(), line);
    }
}

/// Build the results table; one row per evaluated comparison in report order
pub fn comparison_table(report: &ComparisonReport) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        [
            "Feature", "Group A", "n A", "Mean A", "Group B", "n B", "Mean B", "Lift", "p-value",
        ]
        .into_iter()
        .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
    );

    for result in &report.results {
        table.add_row(result_row(result));
    }
    table
}

fn result_row(result: &ComparisonResult) -> Vec<Cell> {
    let lift_color = match result.lift_pct {
        Some(l) if l > 0.0 => Color::Green,
        Some(l) if l < 0.0 => Color::Red,
        _ => Color::White,
    };
    let p_cell = Cell::new(format_option(result.p_value, 4)).set_alignment(CellAlignment::Right);
    let p_cell = if result.is_significant() {
        p_cell.fg(Color::Green).add_attribute(Attribute::Bold)
    } else {
        p_cell.fg(Color::DarkGrey)
    };

    vec![
        Cell::new(&result.name),
        Cell::new(&result.group_a.label),
        Cell::new(result.group_a.count).set_alignment(CellAlignment::Right),
        Cell::new(format_option(result.group_a.mean, 2)).set_alignment(CellAlignment::Right),
        Cell::new(&result.group_b.label),
        Cell::new(result.group_b.count).set_alignment(CellAlignment::Right),
        Cell::new(format_option(result.group_b.mean, 2)).set_alignment(CellAlignment::Right),
        Cell::new(
            result
                .lift_pct
                .map(|l| format!("{:+.1}%", l))
                .unwrap_or_else(|| "n/a".to_string()),
        )
        .fg(lift_color)
        .set_alignment(CellAlignment::Right),
        p_cell,
    ]
}

/// One line per omitted comparison, for warnings
pub fn describe_omitted(omitted: &OmittedComparison) -> String {
    let c = &omitted.comparison;
    if omitted.column_missing {
        format!("{}: column '{}' not found, comparison skipped", c.name, c.column)
    } else {
        let labels: Vec<String> = omitted
            .missing_labels
            .iter()
            .map(|l| format!("'{}'", l))
            .collect();
        format!(
            "{}: no rows with {} in '{}', comparison skipped",
            c.name,
            labels.join(" or "),
            c.column
        )
    }
}

fn format_option(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.*}", decimals, v),
        Some(v) => format!("{}", v),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::Comparison;

    #[test]
    fn test_describe_omitted() {
        let omitted = OmittedComparison {
            comparison: Comparison::new("neighbourhood_group", "Brooklyn", "Manhattan", "Borough"),
            missing_labels: vec!["Brooklyn".to_string(), "Manhattan".to_string()],
            column_missing: false,
        };
        assert_eq!(
            describe_omitted(&omitted),
            "Borough: no rows with 'Brooklyn' or 'Manhattan' in 'neighbourhood_group', comparison skipped"
        );
    }

    #[test]
    fn test_format_option() {
        assert_eq!(format_option(Some(1.23456), 2), "1.23");
        assert_eq!(format_option(None, 2), "n/a");
        assert_eq!(format_option(Some(f64::INFINITY), 2), "inf");
    }
}

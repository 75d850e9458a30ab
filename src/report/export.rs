//! JSON export of a comparison report

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::compare::{ComparisonReport, ComparisonResult, OmittedComparison, SIGNIFICANCE_LEVEL};

/// Metadata about the comparison run
#[derive(Serialize)]
pub struct ComparisonMetadata {
    /// Timestamp of the export (ISO 8601 format)
    pub timestamp: String,
    pub staylift_version: String,
    pub store: String,
    pub table: String,
    pub outcome_column: String,
    pub significance_level: f64,
    /// Store generation the table was read at
    pub generation: u64,
}

#[derive(Serialize)]
pub struct ComparisonSummary {
    pub comparisons_evaluated: usize,
    pub comparisons_omitted: usize,
    pub significant: usize,
    /// Evaluated comparisons without a p-value
    pub untestable: usize,
}

#[derive(Serialize)]
pub struct ComparisonExport<'a> {
    pub metadata: ComparisonMetadata,
    pub summary: ComparisonSummary,
    pub results: &'a [ComparisonResult],
    pub omitted: &'a [OmittedComparison],
    pub narrative: &'a [String],
}

/// Parameters for the export metadata
pub struct ExportParams<'a> {
    pub store: &'a Path,
    pub table: &'a str,
    pub generation: u64,
}

/// Write the report, its narrative and run metadata as pretty JSON
pub fn export_comparison(
    report: &ComparisonReport,
    narrative: &[String],
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = build_export(report, narrative, params);

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize comparison report to JSON")?;

    std::fs::write(output_path, json).with_context(|| {
        format!(
            "Failed to write comparison report to {}",
            output_path.display()
        )
    })?;

    Ok(())
}

fn build_export<'a>(
    report: &'a ComparisonReport,
    narrative: &'a [String],
    params: &ExportParams,
) -> ComparisonExport<'a> {
    ComparisonExport {
        metadata: ComparisonMetadata {
            timestamp: Utc::now().to_rfc3339(),
            staylift_version: env!("CARGO_PKG_VERSION").to_string(),
            store: params.store.display().to_string(),
            table: params.table.to_string(),
            outcome_column: report.outcome.clone(),
            significance_level: SIGNIFICANCE_LEVEL,
            generation: params.generation,
        },
        summary: ComparisonSummary {
            comparisons_evaluated: report.results.len(),
            comparisons_omitted: report.omitted.len(),
            significant: report.significant().count(),
            untestable: report.results.iter().filter(|r| r.p_value.is_none()).count(),
        },
        results: &report.results,
        omitted: &report.omitted,
        narrative,
    }
}

//! `compare` command - evaluate category comparisons on the feature table

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::compare::{narrate, ComparisonEngine, ComparisonSpec};
use crate::pipeline::{RunStatus, TableStore};
use crate::report::{describe_omitted, display_comparison, export_comparison, ExportParams};
use crate::utils::{
    create_spinner, finish_with_success, print_compare_config, print_completion, print_step_header,
    print_step_time, print_success, print_warning,
};

/// Table written by `--save`
pub const RESULTS_TABLE: &str = "ab_comparison_results";

/// Options of the `compare` command
pub struct CompareOptions<'a> {
    pub store: &'a Path,
    pub table: &'a str,
    pub outcome: &'a str,
    pub comparisons: Option<&'a Path>,
    pub save: bool,
    pub export: Option<&'a Path>,
}

pub fn run_compare(options: &CompareOptions) -> Result<()> {
    let mut store = TableStore::open(options.store)
        .with_context(|| format!("Failed to open store {}", options.store.display()))?;
    ensure_pipeline_succeeded(&store)?;

    let spec = match options.comparisons {
        Some(path) => ComparisonSpec::from_json_file(path)?,
        None => ComparisonSpec::listing_defaults(),
    };

    print_compare_config(options.store, options.table, options.outcome, spec.len());

    print_step_header(1, "Comparisons");
    let step_start = Instant::now();
    let spinner = create_spinner("Running Welch tests...");
    let df = store
        .table(options.table)
        .with_context(|| format!("Failed to read table '{}'", options.table))?;
    let report = ComparisonEngine::new(options.outcome).evaluate(df, &spec)?;
    finish_with_success(
        &spinner,
        &format!("{} comparison(s) evaluated", report.results.len()),
    );
    for omitted in &report.omitted {
        print_warning(&describe_omitted(omitted));
    }
    print_step_time(step_start.elapsed());

    let narrative = narrate(&report);
    display_comparison(&report, &narrative);

    if options.save {
        let results = report.to_dataframe()?;
        let mut tx = store.begin();
        tx.put_table(RESULTS_TABLE, results)?;
        tx.commit()
            .with_context(|| format!("Failed to write table '{}'", RESULTS_TABLE))?;
        println!();
        print_success(&format!("Results saved to table '{}'", RESULTS_TABLE));
    }

    if let Some(path) = options.export {
        let params = ExportParams {
            store: options.store,
            table: options.table,
            generation: store.generation(),
        };
        export_comparison(&report, &narrative, path, &params)?;
        print_success(&format!("Report exported to {}", path.display()));
    }

    print_completion("Comparison complete!");
    Ok(())
}

/// The feature table is only trusted after a successful pipeline run
fn ensure_pipeline_succeeded(store: &TableStore) -> Result<()> {
    match store.last_run().map(|run| &run.status) {
        None => anyhow::bail!(
            "The pipeline has not been run on this store since the listings were loaded. Run `staylift run` first."
        ),
        Some(RunStatus::Failed { stage, message }) => anyhow::bail!(
            "The last pipeline run failed at stage '{}': {}. Fix the stage and run `staylift run` again.",
            stage,
            message
        ),
        Some(RunStatus::Succeeded) => Ok(()),
    }
}

//! `load` command - ingest a raw listings file into the store

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use console::style;

use crate::pipeline::{ingest_listings, TableStore, SOURCE_TABLE};
use crate::utils::{
    create_spinner, finish_with_success, print_completion, print_count, print_step_header,
    print_step_time, print_success, print_warning,
};

/// Read `input`, normalise it and install it as the `listings` source table.
/// Replacing the listings invalidates the last pipeline run.
pub fn run_load(input: &Path, store_dir: &Path, infer_schema_length: usize) -> Result<()> {
    print_step_header(1, "Load Dataset");
    println!("      Input: {}", style(input.display()).dim());
    println!("      Store: {}", style(store_dir.display()).dim());

    let step_start = Instant::now();
    let spinner = create_spinner("Reading listings...");
    let (df, stats) = ingest_listings(input, infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", stats.rows_loaded);
    println!("      Columns: {}", stats.columns);
    println!("      Estimated memory: {:.2} MB", stats.memory_mb);
    if stats.duplicates_removed() > 0 {
        print_count(
            "duplicate row(s)",
            stats.duplicates_removed(),
            Some("(removed, first occurrence kept)"),
        );
    }

    let mut store = TableStore::open(store_dir)
        .with_context(|| format!("Failed to open store {}", store_dir.display()))?;
    let had_run = store.last_run().is_some();
    store
        .load_source(SOURCE_TABLE, df)
        .with_context(|| format!("Failed to write table '{}'", SOURCE_TABLE))?;
    print_success(&format!(
        "Table '{}' written (generation {})",
        SOURCE_TABLE,
        store.generation()
    ));
    if had_run {
        print_warning("Derived tables are out of date. Run `staylift run` before `staylift compare`.");
    }
    print_step_time(step_start.elapsed());

    print_completion("Load complete!");
    Ok(())
}

//! `run` command - execute the pipeline stages against the store

use std::path::Path;

use anyhow::{Context, Result};

use crate::pipeline::{
    builtin_stages, run_pipeline, stages_from_dir, FeatureParams, ServiceFeeSplit, TableStore,
    SOURCE_TABLE,
};
use crate::report::display_run_summary;
use crate::utils::{print_completion, print_info, print_step_header, print_step_time};

pub fn run_stages(
    store_dir: &Path,
    price_cutoff: f64,
    service_fee_split: ServiceFeeSplit,
    scripts_dir: Option<&Path>,
) -> Result<()> {
    let mut store = TableStore::open(store_dir)
        .with_context(|| format!("Failed to open store {}", store_dir.display()))?;
    if !store.contains(SOURCE_TABLE) {
        anyhow::bail!(
            "Table '{}' not found in {}. Run `staylift load` first.",
            SOURCE_TABLE,
            store_dir.display()
        );
    }

    let stages = match scripts_dir {
        Some(dir) => {
            print_info(&format!("Using stage scripts from {}", dir.display()));
            stages_from_dir(dir)
        }
        None => builtin_stages(&FeatureParams {
            price_cutoff,
            service_fee_split,
        }),
    };

    print_step_header(1, "Pipeline Stages");
    let run = run_pipeline(&mut store, &stages)?;
    display_run_summary(&run);
    print_step_time(run.elapsed);

    print_completion("Pipeline complete!");
    Ok(())
}

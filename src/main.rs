//! Staylift: Listings Pipeline CLI Tool
//!
//! `load` ingests a raw listings file, `run` executes the transformation
//! stages, `compare` ranks category differences in engagement and `status`
//! shows what the store holds.

use anyhow::Result;
use clap::Parser;

use staylift::cli::{
    run_compare, run_load, run_stages, run_status, Cli, Commands, CompareOptions,
};
use staylift::utils::print_banner;

fn main() -> Result<()> {
    let cli = Cli::parse();

    print_banner(env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Load {
            input,
            store,
            infer_schema_length,
        } => run_load(input, store, *infer_schema_length),
        Commands::Run {
            store,
            price_cutoff,
            service_fee_split,
            scripts_dir,
        } => run_stages(store, *price_cutoff, *service_fee_split, scripts_dir.as_deref()),
        Commands::Compare {
            store,
            table,
            outcome,
            comparisons,
            save,
            export,
        } => run_compare(&CompareOptions {
            store,
            table,
            outcome,
            comparisons: comparisons.as_deref(),
            save: *save,
            export: export.as_deref(),
        }),
        Commands::Status { store } => run_status(store),
    }
}

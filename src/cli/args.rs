//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::{ServiceFeeSplit, DEFAULT_PRICE_CUTOFF};

/// Staylift - Run the listings pipeline and test category differences in engagement
#[derive(Parser, Debug)]
#[command(name = "staylift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a raw listings file (CSV or Parquet) into the store
    Load {
        /// Input file path (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Store directory
        #[arg(short, long, default_value = "staylift_store")]
        store: PathBuf,

        /// Number of rows to use for schema inference (CSV only).
        /// Use 0 for full table scan (very slow for large files).
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },

    /// Run the cleaning, features and aggregates stages in order
    Run {
        /// Store directory
        #[arg(short, long, default_value = "staylift_store")]
        store: PathBuf,

        /// Listings priced below this are `below_cutoff`, all others `at_or_above_cutoff`
        #[arg(long, default_value_t = DEFAULT_PRICE_CUTOFF, value_parser = validate_price_cutoff)]
        price_cutoff: f64,

        /// Service fee split for `service_fee_bucket`: "median" or a fixed amount
        #[arg(long, default_value = "median")]
        service_fee_split: ServiceFeeSplit,

        /// Read `<name>.sql` stage scripts from this directory instead of the
        /// built-in ones. A missing file skips that stage with a warning.
        #[arg(long)]
        scripts_dir: Option<PathBuf>,
    },

    /// Compare engagement between category pairs of the feature table
    Compare {
        /// Store directory
        #[arg(short, long, default_value = "staylift_store")]
        store: PathBuf,

        /// Table holding the derived features
        #[arg(short, long, default_value = "listing_features")]
        table: String,

        /// Numeric outcome column
        #[arg(short, long, default_value = "number_of_reviews")]
        outcome: String,

        /// JSON file with an array of {column, label_a, label_b, name} objects.
        /// Defaults to the built-in listing comparisons.
        #[arg(short, long)]
        comparisons: Option<PathBuf>,

        /// Write the result set to the `ab_comparison_results` table
        #[arg(long, default_value = "false")]
        save: bool,

        /// Write the report, narrative and run metadata to a JSON file
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Show store tables and the outcome of the last pipeline run
    Status {
        /// Store directory
        #[arg(short, long, default_value = "staylift_store")]
        store: PathBuf,
    },
}

/// Validator for price_cutoff parameter
fn validate_price_cutoff(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !value.is_finite() || value < 0.0 {
        Err(format!(
            "price_cutoff must be a finite, non-negative amount, got {}",
            value
        ))
    } else {
        Ok(value)
    }
}

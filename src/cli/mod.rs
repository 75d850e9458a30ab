//! CLI module - argument parsing and subcommand runners

pub mod args;
pub mod compare;
pub mod load;
pub mod run;
pub mod status;

pub use args::{Cli, Commands};
pub use compare::{run_compare, CompareOptions, RESULTS_TABLE};
pub use load::run_load;
pub use run::run_stages;
pub use status::run_status;

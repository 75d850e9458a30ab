//! Report module - terminal tables and JSON export

pub mod comparison_table;
pub mod export;
pub mod run_summary;

pub use comparison_table::*;
pub use export::*;
pub use run_summary::*;

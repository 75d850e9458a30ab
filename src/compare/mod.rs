//! Compare module - Welch tests, lift and ranking of category pairs

pub mod engine;
pub mod narrative;
pub mod spec;
pub mod welch;

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

pub use engine::*;
pub use narrative::*;
pub use spec::*;
pub use welch::*;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("outcome column '{0}' not found")]
    OutcomeNotFound(String),

    #[error("outcome column '{column}' is not numeric (found {dtype})")]
    OutcomeNotNumeric { column: String, dtype: String },

    #[error("failed to read comparison file {}", .path.display())]
    SpecIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid comparison file {}", .path.display())]
    SpecParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

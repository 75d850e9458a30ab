//! Pipeline module - ingestion, table store and staged transformations

pub mod loader;
pub mod manifest;
pub mod orchestrator;
pub mod stages;
pub mod statements;
pub mod store;

pub use loader::*;
pub use manifest::*;
pub use orchestrator::*;
pub use stages::*;
pub use statements::{classify, split_statements, StatementError, StatementKind};
pub use store::*;

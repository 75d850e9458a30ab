//! Staylift: Listings Pipeline and Category Comparison Library
//!
//! Ingests short-term-rental listings into a Parquet-backed table store, runs
//! ordered SQL transformation stages with one transaction per stage, and tests
//! whether engagement differs between categories of derived features.

pub mod cli;
pub mod compare;
pub mod pipeline;
pub mod report;
pub mod utils;

//! Cost Aggregator
//!
//! Derives project totals from the results of a run.

pub mod aggregator;

pub use aggregator::{aggregate, ProjectResult, TOTAL_NAMES};

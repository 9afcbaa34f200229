//! Weather Series Adapter
//!
//! Wraps an externally supplied, time-ordered weather table and answers
//! feasibility queries for install-phase operations.

pub mod series;

pub use series::{OperationWindow, Thresholds, WeatherRecord, WeatherSeries};

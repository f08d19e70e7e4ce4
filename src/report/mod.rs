//! Reporting helpers for a fitted search.
//!
//! `metric_dict` augments every evaluated state with the spread of its
//! per-fold scores; `SelectionReport` bundles that with the best state for
//! serialization.
pub mod metrics;

pub use metrics::{metric_dict, MetricEntry, MetricRow, SelectionReport};

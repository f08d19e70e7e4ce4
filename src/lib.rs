//! feature-selector: generic exhaustive and stepwise feature-subset selection.
//!
//! A `FeatureSelector` scores candidate feature subsets with a cloned
//! estimator template (cross-validated by default) and keeps every result
//! keyed by the canonical subset. Candidate generation is pluggable through
//! the `SearchStrategy` trait; `MinMaxCandidates` enumerates every subset in
//! a size range, `StepCandidates` climbs greedily forward, backward or both.
//!
//! Columns are turned into design-matrix columns by the `columns` module
//! (numeric passthrough, one-hot or ordinal encoding), so a single logical
//! feature may contribute several model columns.
pub mod columns;
pub mod config;
pub mod cross_validation;
pub mod data_handling;
pub mod error;
pub mod feature_selection;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod runner;
pub mod scoring;
pub mod stats;

pub use error::{Result, SelectionError};
pub use feature_selection::{
    CancellationToken, FeatureSelector, FitStatus, MinMaxCandidates, SearchStrategy, State, StepCandidates,
};

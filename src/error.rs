use std::error::Error;
use std::fmt;

use crate::data_handling::FeatureId;

/// Errors raised by the selection library.
///
/// Configuration problems are reported when the selector or a candidate
/// generator is constructed; usage-sequence problems (e.g. `transform`
/// before `fit`) when the offending call is made.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionError {
    /// `min_features` / `max_features` outside the allowed range.
    InvalidFeatureBounds(String),
    /// The configured starting state violates bounds or fixed features.
    InvalidInitialState(String),
    UnknownScorer(String),
    /// Estimator is neither classifier nor regressor and no scoring was given.
    UnsupportedEstimator(String),
    InvalidCrossValidation(String),
    InvalidConfig(String),
    UnknownFeature(FeatureId),
    UnknownCategory { feature: String, value: f64 },
    ShapeMismatch(String),
    NotFitted,
    /// Every evaluated state scored NaN.
    NoValidScore,
    Estimator(String),
    ThreadPool(String),
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SelectionError::InvalidFeatureBounds(msg) => write!(f, "Invalid feature bounds: {}", msg),
            SelectionError::InvalidInitialState(msg) => write!(f, "Invalid initial state: {}", msg),
            SelectionError::UnknownScorer(name) => write!(
                f,
                "Unknown scoring identifier '{}'. Expected one of: {}",
                name,
                crate::scoring::SCORER_NAMES.join(", ")
            ),
            SelectionError::UnsupportedEstimator(name) => write!(
                f,
                "Estimator '{}' must be a classifier or regressor when no scoring is given",
                name
            ),
            SelectionError::InvalidCrossValidation(msg) => write!(f, "Invalid cross-validation plan: {}", msg),
            SelectionError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            SelectionError::UnknownFeature(id) => write!(f, "Feature {} is not part of the column info", id),
            SelectionError::UnknownCategory { feature, value } => {
                write!(f, "Value {} was not seen when encoding feature '{}'", value, feature)
            }
            SelectionError::ShapeMismatch(msg) => write!(f, "Shape mismatch: {}", msg),
            SelectionError::NotFitted => write!(f, "FeatureSelector has not been fitted yet"),
            SelectionError::NoValidScore => write!(f, "No evaluated state produced a finite score"),
            SelectionError::Estimator(msg) => write!(f, "Estimator failure: {}", msg),
            SelectionError::ThreadPool(msg) => write!(f, "Failed to build worker pool: {}", msg),
        }
    }
}

impl Error for SelectionError {}

pub type Result<T> = std::result::Result<T, SelectionError>;

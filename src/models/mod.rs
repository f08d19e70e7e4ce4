//! Estimators usable as selector templates.
pub mod estimator;
pub mod factory;
pub mod gbdt;
pub mod linear;
pub mod logistic;

pub use estimator::{Estimator, EstimatorKind};
pub use gbdt::{GbdtEstimator, GbdtParams};
pub use linear::LinearRegression;
pub use logistic::LogisticRegression;

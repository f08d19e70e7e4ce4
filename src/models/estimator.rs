use ndarray::{Array1, Array2};

use crate::data_handling::FitParams;
use crate::error::{Result, SelectionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimatorKind {
    Classifier,
    Regressor,
    Other,
}

/// The model contract consumed by the selector.
///
/// The selector never fits the template it was given: every evaluation works
/// on its own `boxed_clone`, so implementations need not be reentrant.
pub trait Estimator: Send + Sync {
    /// Fit on `x` (samples x columns) and targets `y`. `x` may have zero
    /// columns when the empty feature set is evaluated.
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> Result<()>;

    /// Predict targets (class labels for classifiers).
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    fn kind(&self) -> EstimatorKind;

    /// A fresh, unfitted copy with the same hyper-parameters.
    fn boxed_clone(&self) -> Box<dyn Estimator>;

    /// Optional human readable name for the model
    fn name(&self) -> &str {
        "estimator"
    }
}

/// Common shape checks for `Estimator::fit` implementations.
pub(crate) fn check_fit_input(x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(SelectionError::ShapeMismatch(format!(
            "x has {} rows but y has {} entries",
            x.nrows(),
            y.len()
        )));
    }
    if x.nrows() == 0 {
        return Err(SelectionError::Estimator("cannot fit on zero samples".to_string()));
    }
    params.check_samples(x.nrows())
}

/// Sample weights from `params`, or all ones.
pub(crate) fn sample_weights(params: &FitParams, n: usize) -> Array1<f64> {
    params
        .sample_weight
        .clone()
        .unwrap_or_else(|| Array1::ones(n))
}

/// Sorted distinct values of `y`.
pub(crate) fn class_labels(y: &Array1<f64>) -> Vec<f64> {
    let mut classes: Vec<f64> = y.iter().copied().collect();
    classes.sort_by(|a, b| a.total_cmp(b));
    classes.dedup_by(|a, b| a.total_cmp(b).is_eq());
    classes
}

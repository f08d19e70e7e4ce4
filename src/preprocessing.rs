//! Small preprocessing utilities shared by the built-in estimators.
//!
//! Provides a simple Scaler for mean/std standardization of design
//! matrices. Gradient-based estimators standardize their inputs with it so
//! that one learning rate works across submodels of different scale.

use ndarray::{Array1, Array2, Axis};

/// Simple standard scaler (per-column mean/std).
#[derive(Clone, Debug)]
pub struct Scaler {
    pub mean: Array1<f64>,
    pub std: Array1<f64>,
}

impl Scaler {
    /// Minimum stddev to avoid division by zero when transforming.
    const MIN_STD: f64 = 1e-12;

    /// Transform all rows and return a new matrix.
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        (x - &self.mean) / &self.std
    }
}

/// Fit a `Scaler` from a matrix where rows are samples and columns are
/// features. A matrix without columns gives an empty scaler.
pub fn fit_scaler(x: &Array2<f64>) -> Scaler {
    let ncols = x.ncols();
    if x.nrows() == 0 || ncols == 0 {
        return Scaler {
            mean: Array1::zeros(ncols),
            std: Array1::ones(ncols),
        };
    }

    let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(ncols));
    let std = x.std_axis(Axis(0), 0.0).mapv(|s| if s < Scaler::MIN_STD { 1.0 } else { s });

    Scaler { mean, std }
}

/// Fit a scaler and return the transformed matrix in one call.
pub fn fit_transform(x: &Array2<f64>) -> Array2<f64> {
    let sc = fit_scaler(x);
    sc.transform(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_scaler_mean_and_std() {
        let x = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let sc = fit_scaler(&x);
        assert!((sc.mean[0] - 2.5).abs() < 1e-12);
        assert!((sc.mean[1] - 25.0).abs() < 1e-12);

        let t = fit_transform(&x);
        for c in 0..2 {
            assert!(t.column(c).sum().abs() < 1e-9);
        }
    }

    #[test]
    fn test_constant_column_is_left_centered() {
        let x = array![[5.0], [5.0], [5.0]];
        let t = fit_transform(&x);
        assert!(t.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_zero_columns() {
        let x = Array2::<f64>::zeros((3, 0));
        let sc = fit_scaler(&x);
        assert_eq!(sc.transform(&x).shape(), &[3, 0]);
    }
}

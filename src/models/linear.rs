use ndarray::{Array1, Array2, Axis};

use crate::data_handling::FitParams;
use crate::error::{Result, SelectionError};
use crate::models::estimator::{check_fit_input, sample_weights, Estimator, EstimatorKind};

/// Weighted ridge least squares (`alpha = 0` gives ordinary least squares).
#[derive(Debug, Clone)]
pub struct LinearRegression {
    pub alpha: f64,
    pub fit_intercept: bool,
    coef: Option<Array1<f64>>,
    intercept: f64,
}

impl Default for LinearRegression {
    fn default() -> Self {
        LinearRegression::new(0.0, true)
    }
}

impl LinearRegression {
    pub fn new(alpha: f64, fit_intercept: bool) -> Self {
        LinearRegression {
            alpha,
            fit_intercept,
            coef: None,
            intercept: 0.0,
        }
    }

    pub fn coef(&self) -> Option<&Array1<f64>> {
        self.coef.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

/// Solve `a x = b` for symmetric positive definite `a` by Cholesky
/// decomposition. Returns `None` when `a` is not positive definite.
pub(crate) fn solve_spd(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));
    for j in 0..n {
        let diag = a[(j, j)] - (0..j).map(|k| l[(j, k)].powi(2)).sum::<f64>();
        if diag <= 0.0 || !diag.is_finite() {
            return None;
        }
        l[(j, j)] = diag.sqrt();
        for i in (j + 1)..n {
            let off = a[(i, j)] - (0..j).map(|k| l[(i, k)] * l[(j, k)]).sum::<f64>();
            l[(i, j)] = off / l[(j, j)];
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let s = b[i] - (0..i).map(|k| l[(i, k)] * z[k]).sum::<f64>();
        z[i] = s / l[(i, i)];
    }
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let s = z[i] - ((i + 1)..n).map(|k| l[(k, i)] * x[k]).sum::<f64>();
        x[i] = s / l[(i, i)];
    }
    Some(x)
}

impl Estimator for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> Result<()> {
        check_fit_input(x, y, params)?;
        let n_cols = x.ncols();
        let w = sample_weights(params, x.nrows());
        let w_sum = w.sum();
        if w_sum <= 0.0 {
            return Err(SelectionError::Estimator("sample weights must sum to a positive value".to_string()));
        }

        let (x_mean, y_mean) = if self.fit_intercept {
            (x.t().dot(&w) / w_sum, w.dot(y) / w_sum)
        } else {
            (Array1::zeros(n_cols), 0.0)
        };
        let xc = x - &x_mean;
        let yc = y - y_mean;

        let xw = &xc * &w.view().insert_axis(Axis(1));
        let mut gram = xc.t().dot(&xw);
        for j in 0..n_cols {
            gram[(j, j)] += self.alpha;
        }
        let rhs = xw.t().dot(&yc);

        let mut coef = solve_spd(&gram, &rhs);
        if coef.is_none() {
            // rank-deficient design: retry with a growing ridge
            let scale = (gram.diag().sum() / n_cols.max(1) as f64).max(1.0);
            let mut jitter = 1e-10 * scale;
            while coef.is_none() && jitter < scale {
                let mut damped = gram.clone();
                for j in 0..n_cols {
                    damped[(j, j)] += jitter;
                }
                coef = solve_spd(&damped, &rhs);
                jitter *= 100.0;
            }
        }
        let coef = coef.ok_or_else(|| SelectionError::Estimator("least squares system is singular".to_string()))?;

        self.intercept = if self.fit_intercept { y_mean - x_mean.dot(&coef) } else { 0.0 };
        self.coef = Some(coef);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let coef = self
            .coef
            .as_ref()
            .ok_or_else(|| SelectionError::Estimator("LinearRegression is not fitted".to_string()))?;
        if x.ncols() != coef.len() {
            return Err(SelectionError::ShapeMismatch(format!(
                "model fitted on {} columns, got {}",
                coef.len(),
                x.ncols()
            )));
        }
        Ok(x.dot(coef) + self.intercept)
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regressor
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(LinearRegression::new(self.alpha, self.fit_intercept))
    }

    fn name(&self) -> &str {
        "linear_regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_recovers_coefficients() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [2.0, 1.0], [3.0, 5.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -1.0 * v) + 0.5;
        let mut model = LinearRegression::default();
        model.fit(&x, &y, &FitParams::default()).unwrap();
        let coef = model.coef().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-8);
        assert!((coef[1] + 1.0).abs() < 1e-8);
        assert!((model.intercept() - 0.5).abs() < 1e-8);
    }

    #[test]
    fn test_zero_columns_predicts_weighted_mean() {
        let x = Array2::<f64>::zeros((4, 0));
        let y = array![1.0, 2.0, 3.0, 4.0];
        let params = FitParams::default().with_sample_weight(array![1.0, 1.0, 1.0, 5.0]);
        let mut model = LinearRegression::default();
        model.fit(&x, &y, &params).unwrap();
        let pred = model.predict(&x).unwrap();
        assert!((pred[0] - 26.0 / 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_collinear_columns_still_fit() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let mut model = LinearRegression::default();
        model.fit(&x, &y, &FitParams::default()).unwrap();
        let pred = model.predict(&x).unwrap();
        for (p, t) in pred.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-4);
        }
    }
}

use ndarray::{Array1, Array2};

use crate::data_handling::FitParams;
use crate::error::{Result, SelectionError};
use crate::models::estimator::{check_fit_input, class_labels, sample_weights, Estimator, EstimatorKind};
use crate::preprocessing::{fit_scaler, Scaler};

/// Binary logistic regression trained by full-batch gradient descent on
/// standardized inputs with an L2 penalty.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub learning_rate: f64,
    pub max_iter: usize,
    pub l2: f64,
    pub tol: f64,
    fitted: Option<FittedLogistic>,
}

#[derive(Debug, Clone)]
struct FittedLogistic {
    scaler: Scaler,
    weights: Array1<f64>,
    bias: f64,
    /// negative class, positive class (equal when only one class was seen)
    classes: (f64, f64),
}

impl Default for LogisticRegression {
    fn default() -> Self {
        LogisticRegression::new(0.5, 500, 1e-4)
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize, l2: f64) -> Self {
        LogisticRegression {
            learning_rate,
            max_iter,
            l2,
            tol: 1e-7,
            fitted: None,
        }
    }

    /// Probability of the positive (larger) class.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or_else(|| SelectionError::Estimator("LogisticRegression is not fitted".to_string()))?;
        if x.ncols() != fitted.weights.len() {
            return Err(SelectionError::ShapeMismatch(format!(
                "model fitted on {} columns, got {}",
                fitted.weights.len(),
                x.ncols()
            )));
        }
        let z = fitted.scaler.transform(x).dot(&fitted.weights) + fitted.bias;
        Ok(z.mapv(sigmoid))
    }
}

impl Estimator for LogisticRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> Result<()> {
        check_fit_input(x, y, params)?;
        let classes = class_labels(y);
        let classes = match classes.as_slice() {
            [only] => (*only, *only),
            [neg, pos] => (*neg, *pos),
            _ => {
                return Err(SelectionError::Estimator(format!(
                    "LogisticRegression expects at most 2 classes, got {}",
                    classes.len()
                )))
            }
        };

        let scaler = fit_scaler(x);
        let xs = scaler.transform(x);
        let target = y.mapv(|v| if v == classes.1 && classes.0 != classes.1 { 1.0 } else { 0.0 });
        let w = sample_weights(params, x.nrows());
        let w_sum = w.sum();
        if w_sum <= 0.0 {
            return Err(SelectionError::Estimator("sample weights must sum to a positive value".to_string()));
        }

        let mut weights = Array1::<f64>::zeros(x.ncols());
        let mut bias = 0.0;
        for iter in 0..self.max_iter {
            let p = (xs.dot(&weights) + bias).mapv(sigmoid);
            let residual = (&p - &target) * &w;
            let grad_w = xs.t().dot(&residual) / w_sum + &weights * self.l2;
            let grad_b = residual.sum() / w_sum;

            weights = weights - grad_w.mapv(|g| g * self.learning_rate);
            bias -= self.learning_rate * grad_b;

            let grad_norm = grad_w.dot(&grad_w) + grad_b * grad_b;
            if grad_norm.sqrt() < self.tol {
                log::trace!("LogisticRegression converged after {} iterations", iter + 1);
                break;
            }
        }

        self.fitted = Some(FittedLogistic {
            scaler,
            weights,
            bias,
            classes,
        });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let (neg, pos) = self
            .fitted
            .as_ref()
            .map(|f| f.classes)
            .ok_or_else(|| SelectionError::Estimator("LogisticRegression is not fitted".to_string()))?;
        Ok(proba.mapv(|p| if p >= 0.5 { pos } else { neg }))
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Classifier
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        let mut fresh = LogisticRegression::new(self.learning_rate, self.max_iter, self.l2);
        fresh.tol = self.tol;
        Box::new(fresh)
    }

    fn name(&self) -> &str {
        "logistic_regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_data() {
        let x = array![[0.0, 5.0], [0.2, 1.0], [0.4, 3.0], [2.0, 2.0], [2.2, 4.0], [2.4, 0.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let mut model = LogisticRegression::default();
        model.fit(&x, &y, &FitParams::default()).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = array![[1.0], [2.0]];
        let y = array![3.0, 3.0];
        let mut model = LogisticRegression::default();
        model.fit(&x, &y, &FitParams::default()).unwrap();
        assert_eq!(model.predict(&x).unwrap().to_vec(), vec![3.0, 3.0]);
    }

    #[test]
    fn test_rejects_multiclass() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 2.0];
        let mut model = LogisticRegression::default();
        assert!(model.fit(&x, &y, &FitParams::default()).is_err());
    }
}

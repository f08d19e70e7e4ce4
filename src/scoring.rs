//! Scoring of a fitted estimator on a design matrix.
//!
//! Scores follow the "greater is better" convention: error metrics are
//! negated (`neg_mean_squared_error`, ...), so the selector can always
//! maximize.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ndarray::{Array1, Array2};

use crate::error::{Result, SelectionError};
use crate::models::{Estimator, EstimatorKind};

/// Identifiers accepted by `Scorer::from_name`.
pub const SCORER_NAMES: &[&str] = &[
    "accuracy",
    "r2",
    "neg_mean_squared_error",
    "neg_mean_absolute_error",
    "neg_median_absolute_error",
    "precision",
    "recall",
    "f1",
];

pub type ScoreFn = Arc<dyn Fn(&dyn Estimator, &Array2<f64>, &Array1<f64>) -> Result<f64> + Send + Sync>;

#[derive(Clone)]
pub enum Scorer {
    Accuracy,
    R2,
    NegMeanSquaredError,
    NegMeanAbsoluteError,
    NegMedianAbsoluteError,
    /// Binary metrics; the positive class is `1.0`.
    Precision,
    Recall,
    F1,
    Custom { name: String, func: ScoreFn },
}

impl fmt::Debug for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scorer({})", self.name())
    }
}

impl FromStr for Scorer {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "accuracy" => Ok(Scorer::Accuracy),
            "r2" => Ok(Scorer::R2),
            "neg_mean_squared_error" | "mean_squared_error" => Ok(Scorer::NegMeanSquaredError),
            "neg_mean_absolute_error" | "mean_absolute_error" => Ok(Scorer::NegMeanAbsoluteError),
            "neg_median_absolute_error" | "median_absolute_error" => Ok(Scorer::NegMedianAbsoluteError),
            "precision" => Ok(Scorer::Precision),
            "recall" => Ok(Scorer::Recall),
            "f1" => Ok(Scorer::F1),
            _ => Err(SelectionError::UnknownScorer(s.to_string())),
        }
    }
}

impl Scorer {
    pub fn from_name(name: &str) -> Result<Self> {
        name.parse()
    }

    /// `accuracy` for classifiers, `r2` for regressors.
    pub fn default_for(estimator: &dyn Estimator) -> Result<Self> {
        match estimator.kind() {
            EstimatorKind::Classifier => Ok(Scorer::Accuracy),
            EstimatorKind::Regressor => Ok(Scorer::R2),
            EstimatorKind::Other => Err(SelectionError::UnsupportedEstimator(estimator.name().to_string())),
        }
    }

    pub fn custom<F>(name: &str, func: F) -> Self
    where
        F: Fn(&dyn Estimator, &Array2<f64>, &Array1<f64>) -> Result<f64> + Send + Sync + 'static,
    {
        Scorer::Custom {
            name: name.to_string(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Scorer::Accuracy => "accuracy",
            Scorer::R2 => "r2",
            Scorer::NegMeanSquaredError => "neg_mean_squared_error",
            Scorer::NegMeanAbsoluteError => "neg_mean_absolute_error",
            Scorer::NegMedianAbsoluteError => "neg_median_absolute_error",
            Scorer::Precision => "precision",
            Scorer::Recall => "recall",
            Scorer::F1 => "f1",
            Scorer::Custom { name, .. } => name,
        }
    }

    /// Score a fitted estimator on `(x, y)`.
    pub fn score(&self, estimator: &dyn Estimator, x: &Array2<f64>, y: &Array1<f64>) -> Result<f64> {
        let metric: fn(&Array1<f64>, &Array1<f64>) -> f64 = match self {
            Scorer::Custom { func, .. } => return func(estimator, x, y),
            Scorer::Accuracy => accuracy,
            Scorer::R2 => r2,
            Scorer::NegMeanSquaredError => |t, p| -mean_squared_error(t, p),
            Scorer::NegMeanAbsoluteError => |t, p| -mean_absolute_error(t, p),
            Scorer::NegMedianAbsoluteError => |t, p| -median_absolute_error(t, p),
            Scorer::Precision => |t, p| precision_recall_f1(t, p).0,
            Scorer::Recall => |t, p| precision_recall_f1(t, p).1,
            Scorer::F1 => |t, p| precision_recall_f1(t, p).2,
        };
        let y_pred = estimator.predict(x)?;
        if y_pred.len() != y.len() {
            return Err(SelectionError::ShapeMismatch(format!(
                "{} predictions for {} targets",
                y_pred.len(),
                y.len()
            )));
        }
        Ok(metric(y, &y_pred))
    }
}

pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let hits = y_true.iter().zip(y_pred.iter()).filter(|(t, p)| t == p).count();
    hits as f64 / y_true.len() as f64
}

/// Coefficient of determination. A constant target scores 1.0 when it is
/// predicted exactly and 0.0 otherwise.
pub fn r2(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(f64::NAN);
    let ss_res: f64 = y_true.iter().zip(y_pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(|d| d * d).mean().unwrap_or(f64::NAN)
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(f64::abs).mean().unwrap_or(f64::NAN)
}

pub fn median_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mut errors: Vec<f64> = (y_true - y_pred).mapv(f64::abs).to_vec();
    if errors.is_empty() {
        return f64::NAN;
    }
    errors.sort_by(|a, b| a.total_cmp(b));
    let mid = errors.len() / 2;
    if errors.len() % 2 == 0 {
        (errors[mid - 1] + errors[mid]) / 2.0
    } else {
        errors[mid]
    }
}

/// Binary precision, recall and F1 for positive label `1.0`; undefined
/// ratios are reported as 0.0.
pub fn precision_recall_f1(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (f64, f64, f64) {
    let (mut tp, mut fp, mut fneg) = (0usize, 0usize, 0usize);
    for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
        match (t == 1.0, p == 1.0) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fneg += 1,
            (false, false) => {}
        }
    }
    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fneg);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_name() {
        assert!(matches!(Scorer::from_name("R2"), Ok(Scorer::R2)));
        assert!(matches!(
            Scorer::from_name("mean_squared_error"),
            Ok(Scorer::NegMeanSquaredError)
        ));
        assert_eq!(
            Scorer::from_name("balanced_kappa").unwrap_err(),
            SelectionError::UnknownScorer("balanced_kappa".to_string())
        );
    }

    #[test]
    fn test_regression_metrics() {
        let t = array![1.0, 2.0, 3.0, 4.0];
        let p = array![1.0, 2.0, 3.0, 8.0];
        assert!((mean_squared_error(&t, &p) - 4.0).abs() < 1e-12);
        assert!((mean_absolute_error(&t, &p) - 1.0).abs() < 1e-12);
        assert!((median_absolute_error(&t, &p) - 0.0).abs() < 1e-12);
        assert!((r2(&t, &t) - 1.0).abs() < 1e-12);
        assert!((r2(&t, &p) - (1.0 - 16.0 / 5.0)).abs() < 1e-12);
    }

    #[test]
    fn test_classification_metrics() {
        let t = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let p = array![1.0, 0.0, 1.0, 0.0, 1.0];
        assert!((accuracy(&t, &p) - 0.6).abs() < 1e-12);
        let (precision, recall, f1) = precision_recall_f1(&t, &p);
        assert!((precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall - 2.0 / 3.0).abs() < 1e-12);
        assert!((f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_score_uses_predictions() {
        use crate::models::LinearRegression;
        use crate::data_handling::FitParams;

        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 5.0, 7.0];
        let mut model = LinearRegression::default();
        model.fit(&x, &y, &FitParams::default()).unwrap();
        assert!((Scorer::R2.score(&model, &x, &y).unwrap() - 1.0).abs() < 1e-9);
        assert!(Scorer::NegMeanSquaredError.score(&model, &x, &y).unwrap().abs() < 1e-9);

        let custom = Scorer::custom("rows", |_est: &dyn Estimator, x: &Array2<f64>, _y: &Array1<f64>| {
            Ok(x.nrows() as f64)
        });
        assert_eq!(custom.score(&model, &x, &y).unwrap(), 4.0);
    }
}

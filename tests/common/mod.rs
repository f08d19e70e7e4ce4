//! Shared fixtures for the integration tests.
//!
//! The fixture dataset fills column `j` with the constant `j + 1`, so a
//! scorer can read back which features a design matrix was built from and
//! return a score chosen by the test.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use feature_selector::data_handling::{Dataset, FitParams};
use feature_selector::error::Result;
use feature_selector::models::{Estimator, EstimatorKind};
use feature_selector::scoring::Scorer;
use ndarray::{Array1, Array2};

pub fn constant_dataset(n_samples: usize, n_features: usize) -> (Dataset, Array1<f64>) {
    let x = Array2::from_shape_fn((n_samples, n_features), |(_, j)| (j + 1) as f64);
    let y = Array1::from_shape_fn(n_samples, |i| i as f64);
    (Dataset::new(x), y)
}

/// Feature indices encoded in the first row of a fixture design matrix.
pub fn features_of(x: &Array2<f64>) -> Vec<usize> {
    if x.nrows() == 0 {
        return Vec::new();
    }
    x.row(0).iter().map(|&v| v as usize - 1).collect()
}

/// Scorer that returns `value(features)` for the features of the matrix.
pub fn subset_scorer<F>(value: F) -> Scorer
where
    F: Fn(&[usize]) -> f64 + Send + Sync + 'static,
{
    Scorer::custom("subset_value", move |_est: &dyn Estimator, x: &Array2<f64>, _y: &Array1<f64>| {
        Ok(value(&features_of(x)))
    })
}

/// Regressor that learns nothing and counts how often it was fitted.
#[derive(Debug, Clone, Default)]
pub struct CountingEstimator {
    pub fits: Arc<AtomicUsize>,
    n_columns: Option<usize>,
}

impl CountingEstimator {
    pub fn fit_count(&self) -> usize {
        self.fits.load(Ordering::SeqCst)
    }
}

impl Estimator for CountingEstimator {
    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>, _params: &FitParams) -> Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.n_columns = Some(x.ncols());
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::zeros(x.nrows()))
    }

    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regressor
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(CountingEstimator {
            fits: Arc::clone(&self.fits),
            n_columns: None,
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

pub fn fixed_state_score(features: &[usize], best: usize, penalty: f64) -> f64 {
    let bonus = if features.contains(&best) { 1.0 } else { 0.0 };
    bonus - penalty * features.len().saturating_sub(1) as f64
}

//! Data structures for the raw inputs of a feature search.
//!
//! This module defines `FeatureId`, the `Dataset` wrapper that pairs a numeric
//! matrix with stable feature identifiers, and `FitParams`, the free-form
//! parameters forwarded to every estimator fit.
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SelectionError};

/// Identifier of a logical feature: a positional column index or a label.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Index(usize),
    Label(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Index(idx) => write!(f, "{}", idx),
            FeatureId::Label(label) => write!(f, "{}", label),
        }
    }
}

impl From<usize> for FeatureId {
    fn from(idx: usize) -> Self {
        FeatureId::Index(idx)
    }
}

impl From<&str> for FeatureId {
    fn from(label: &str) -> Self {
        FeatureId::Label(label.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(label: String) -> Self {
        FeatureId::Label(label)
    }
}

/// Samples-by-features matrix with one identifier per column.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub x: Array2<f64>,
    pub feature_ids: Vec<FeatureId>,
}

impl Dataset {
    /// Wrap a matrix, identifying columns by position.
    pub fn new(x: Array2<f64>) -> Self {
        let feature_ids = (0..x.ncols()).map(FeatureId::Index).collect();
        Dataset { x, feature_ids }
    }

    /// Wrap a matrix, identifying columns by label.
    pub fn with_labels(x: Array2<f64>, labels: Vec<String>) -> Result<Self> {
        if labels.len() != x.ncols() {
            return Err(SelectionError::ShapeMismatch(format!(
                "{} labels given for {} columns",
                labels.len(),
                x.ncols()
            )));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(SelectionError::InvalidConfig(format!("duplicate column label '{}'", label)));
            }
        }
        Ok(Dataset {
            x,
            feature_ids: labels.into_iter().map(FeatureId::Label).collect(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Position of `id` among the dataset columns.
    pub fn position(&self, id: &FeatureId) -> Option<usize> {
        self.feature_ids.iter().position(|f| f == id)
    }

    pub fn column(&self, id: &FeatureId) -> Result<ArrayView1<'_, f64>> {
        let idx = self
            .position(id)
            .ok_or_else(|| SelectionError::UnknownFeature(id.clone()))?;
        Ok(self.x.column(idx))
    }

    pub fn log_input_data_summary(&self) {
        log::info!(
            "Input data: {} samples, {} features ({})",
            self.n_samples(),
            self.n_features(),
            self.feature_ids
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

/// Extra parameters passed through to `Estimator::fit`.
///
/// `sample_weight` is sample-aligned and gets sliced to the training rows of
/// each cross-validation fold; `extra` is forwarded untouched.
#[derive(Debug, Clone, Default)]
pub struct FitParams {
    pub sample_weight: Option<Array1<f64>>,
    pub extra: BTreeMap<String, f64>,
}

impl FitParams {
    pub fn with_sample_weight(mut self, weights: Array1<f64>) -> Self {
        self.sample_weight = Some(weights);
        self
    }

    pub fn with_extra(mut self, key: &str, value: f64) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.extra.get(key).copied()
    }

    pub fn check_samples(&self, n_samples: usize) -> Result<()> {
        match &self.sample_weight {
            Some(w) if w.len() != n_samples => Err(SelectionError::ShapeMismatch(format!(
                "sample_weight has {} entries for {} samples",
                w.len(),
                n_samples
            ))),
            _ => Ok(()),
        }
    }

    /// Fit parameters restricted to `rows`.
    pub fn select_rows(&self, rows: &[usize]) -> FitParams {
        FitParams {
            sample_weight: self.sample_weight.as_ref().map(|w| w.select(Axis(0), rows)),
            extra: self.extra.clone(),
        }
    }
}

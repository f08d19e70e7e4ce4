//! Column encoding: turning logical features into design-matrix columns.
//!
//! Each feature of a `Dataset` maps to a `ColumnEncoder` that extracts one or
//! more numeric columns for it. Numeric features pass through, categorical
//! features are one-hot encoded (first level dropped) and ordinal features
//! become level codes. Levels are learned once, when the `ColumnInfo` is
//! built, so the same state always yields the same submodel matrix.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_handling::{Dataset, FeatureId};
use crate::error::{Result, SelectionError};
use crate::feature_selection::state::State;

/// Extracts the numeric columns of a single logical feature.
pub trait ColumnEncoder: Send + Sync + fmt::Debug {
    /// Encoded columns for this feature, one row per sample of `data`.
    fn get_columns(&self, data: &Dataset) -> Result<Array2<f64>>;

    /// Names of the produced columns.
    fn column_names(&self) -> Vec<String>;

    fn width(&self) -> usize {
        self.column_names().len()
    }
}

/// Builds the design matrix for a state.
pub trait SubmodelBuilder: Send + Sync {
    fn build_submodel(&self, data: &Dataset, state: &State) -> Result<Array2<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Ordinal,
}

/// Which dataset columns are categorical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalFeatures {
    #[default]
    None,
    Mask(Vec<bool>),
    Indices(Vec<usize>),
}

impl CategoricalFeatures {
    /// One `ColumnKind` per dataset column.
    pub fn kinds(&self, n_features: usize) -> Result<Vec<ColumnKind>> {
        let mut kinds = vec![ColumnKind::Numeric; n_features];
        match self {
            CategoricalFeatures::None => {}
            CategoricalFeatures::Mask(mask) => {
                if mask.len() != n_features {
                    return Err(SelectionError::InvalidConfig(format!(
                        "categorical mask has {} entries for {} features",
                        mask.len(),
                        n_features
                    )));
                }
                for (kind, &is_cat) in kinds.iter_mut().zip(mask) {
                    if is_cat {
                        *kind = ColumnKind::Categorical;
                    }
                }
            }
            CategoricalFeatures::Indices(indices) => {
                for &idx in indices {
                    let kind = kinds.get_mut(idx).ok_or_else(|| {
                        SelectionError::InvalidConfig(format!(
                            "categorical index {} out of range for {} features",
                            idx, n_features
                        ))
                    })?;
                    *kind = ColumnKind::Categorical;
                }
            }
        }
        Ok(kinds)
    }
}

#[derive(Debug, Clone)]
enum Encoding {
    Identity,
    OneHot { levels: Vec<f64> },
    Ordinal { levels: Vec<f64> },
}

/// Built-in encoder for one dataset column.
#[derive(Debug, Clone)]
pub struct Column {
    pub id: FeatureId,
    pub name: String,
    pub kind: ColumnKind,
    pub columns: Vec<String>,
    encoding: Encoding,
}

fn sorted_levels(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut levels: Vec<f64> = values.collect();
    levels.sort_by(|a, b| a.total_cmp(b));
    levels.dedup_by(|a, b| a.total_cmp(b).is_eq());
    levels
}

fn level_position(levels: &[f64], value: f64) -> Option<usize> {
    levels.iter().position(|l| l.total_cmp(&value).is_eq())
}

impl Column {
    /// Learn the encoding of `id` from `data`.
    pub fn fit(data: &Dataset, id: &FeatureId, kind: ColumnKind) -> Result<Self> {
        let values = data.column(id)?;
        let name = id.to_string();
        let (encoding, columns) = match kind {
            ColumnKind::Numeric => (Encoding::Identity, vec![name.clone()]),
            ColumnKind::Categorical => {
                let levels = sorted_levels(values.iter().copied());
                let columns = levels
                    .iter()
                    .skip(1)
                    .map(|level| format!("{}[{}]", name, level))
                    .collect();
                (Encoding::OneHot { levels }, columns)
            }
            ColumnKind::Ordinal => {
                let levels = sorted_levels(values.iter().copied());
                (Encoding::Ordinal { levels }, vec![name.clone()])
            }
        };
        Ok(Column {
            id: id.clone(),
            name,
            kind,
            columns,
            encoding,
        })
    }

    /// Rename the feature and its output columns.
    pub fn renamed(mut self, new_name: &str) -> Self {
        self.columns = self
            .columns
            .iter()
            .map(|c| c.replacen(&self.name, new_name, 1))
            .collect();
        self.name = new_name.to_string();
        self
    }
}

impl ColumnEncoder for Column {
    fn get_columns(&self, data: &Dataset) -> Result<Array2<f64>> {
        let values = data.column(&self.id)?;
        let n = values.len();
        match &self.encoding {
            Encoding::Identity => Ok(values.to_owned().insert_axis(Axis(1))),
            Encoding::OneHot { levels } => {
                let width = levels.len().saturating_sub(1);
                let mut out = Array2::zeros((n, width));
                for (row, &v) in values.iter().enumerate() {
                    // unseen levels and the dropped first level stay all-zero
                    if let Some(pos) = level_position(levels, v) {
                        if pos > 0 {
                            out[(row, pos - 1)] = 1.0;
                        }
                    }
                }
                Ok(out)
            }
            Encoding::Ordinal { levels } => {
                let mut out = Array2::zeros((n, 1));
                for (row, &v) in values.iter().enumerate() {
                    let pos = level_position(levels, v).ok_or_else(|| SelectionError::UnknownCategory {
                        feature: self.name.clone(),
                        value: v,
                    })?;
                    out[(row, 0)] = pos as f64;
                }
                Ok(out)
            }
        }
    }

    fn column_names(&self) -> Vec<String> {
        self.columns.clone()
    }
}

/// Mapping from feature id to its encoder, in dataset column order.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    order: Vec<FeatureId>,
    encoders: BTreeMap<FeatureId, Arc<dyn ColumnEncoder>>,
}

impl ColumnInfo {
    pub fn from_dataset(
        data: &Dataset,
        categorical: &CategoricalFeatures,
        custom_feature_names: Option<&[String]>,
    ) -> Result<Self> {
        let kinds = categorical.kinds(data.n_features())?;
        Self::with_kinds(data, &kinds, custom_feature_names)
    }

    pub fn with_kinds(
        data: &Dataset,
        kinds: &[ColumnKind],
        custom_feature_names: Option<&[String]>,
    ) -> Result<Self> {
        let n_features = data.n_features();
        if kinds.len() != n_features {
            return Err(SelectionError::InvalidConfig(format!(
                "{} column kinds given for {} features",
                kinds.len(),
                n_features
            )));
        }
        if let Some(names) = custom_feature_names {
            if names.len() != n_features {
                return Err(SelectionError::InvalidConfig(format!(
                    "custom_feature_names must have {} entries, got {}",
                    n_features,
                    names.len()
                )));
            }
        }

        let mut encoders: BTreeMap<FeatureId, Arc<dyn ColumnEncoder>> = BTreeMap::new();
        for (i, (id, &kind)) in data.feature_ids.iter().zip(kinds).enumerate() {
            let mut column = Column::fit(data, id, kind)?;
            if let Some(names) = custom_feature_names {
                column = column.renamed(&names[i]);
            }
            encoders.insert(id.clone(), Arc::new(column));
        }

        Ok(ColumnInfo {
            order: data.feature_ids.clone(),
            encoders,
        })
    }

    /// Replace (or add) the encoder used for `id`.
    pub fn insert(&mut self, id: FeatureId, encoder: Arc<dyn ColumnEncoder>) {
        if !self.encoders.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.encoders.insert(id, encoder);
    }

    pub fn get(&self, id: &FeatureId) -> Option<&Arc<dyn ColumnEncoder>> {
        self.encoders.get(id)
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.encoders.contains_key(id)
    }

    pub fn feature_ids(&self) -> &[FeatureId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Design-matrix column range of every feature in the full model.
    pub fn column_map(&self) -> BTreeMap<FeatureId, Range<usize>> {
        let mut map = BTreeMap::new();
        let mut idx = 0;
        for id in &self.order {
            let width = self.encoders[id].width();
            map.insert(id.clone(), idx..idx + width);
            idx += width;
        }
        map
    }

    /// Names of the design columns produced for `state`.
    pub fn feature_names(&self, state: &State) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for id in state.iter() {
            let encoder = self
                .get(id)
                .ok_or_else(|| SelectionError::UnknownFeature(id.clone()))?;
            names.extend(encoder.column_names());
        }
        Ok(names)
    }
}

impl SubmodelBuilder for ColumnInfo {
    fn build_submodel(&self, data: &Dataset, state: &State) -> Result<Array2<f64>> {
        let n_samples = data.n_samples();
        let mut blocks = Vec::with_capacity(state.len());
        for id in state.iter() {
            let encoder = self
                .get(id)
                .ok_or_else(|| SelectionError::UnknownFeature(id.clone()))?;
            let block = encoder.get_columns(data)?;
            if block.nrows() != n_samples {
                return Err(SelectionError::ShapeMismatch(format!(
                    "encoder for {} returned {} rows, expected {}",
                    id,
                    block.nrows(),
                    n_samples
                )));
            }
            blocks.push(block);
        }

        if blocks.is_empty() {
            return Ok(Array2::zeros((n_samples, 0)));
        }
        let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
        ndarray::concatenate(Axis(1), &views).map_err(|e| SelectionError::ShapeMismatch(e.to_string()))
    }
}

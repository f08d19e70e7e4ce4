use std::collections::BTreeSet;
use std::sync::Arc;

use crate::columns::{CategoricalFeatures, ColumnInfo};
use crate::data_handling::{Dataset, FeatureId};
use crate::error::{Result, SelectionError};
use crate::feature_selection::results::ResultTable;
use crate::feature_selection::state::State;

/// Outcome of one round as judged by the strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    /// State reported for the round; also the reference state for the next
    /// `propose` call. `None` when no candidate produced a usable score.
    pub state: Option<State>,
    pub score: f64,
    pub finished: bool,
}

/// Candidate generation and termination policy of a search.
pub trait SearchStrategy: Send + Sync {
    /// The state evaluated before the first round.
    fn initial_state(&self) -> State;

    /// Next batch of candidates given the round's reference state. `None`
    /// and an empty batch both end the search.
    fn propose(&mut self, state: &State) -> Option<Vec<State>>;

    /// Decide whether the search is done after merging `batch` into
    /// `results`. `best_state` is the driver's best state so far.
    fn is_finished(&self, results: &ResultTable, best_state: &State, batch: &ResultTable) -> RoundOutcome;

    /// Encoders used to build submodels for the proposed states.
    fn column_info(&self) -> Arc<ColumnInfo>;

    fn fixed_features(&self) -> &BTreeSet<FeatureId>;

    /// Called at the start of every fit so a strategy can be reused.
    fn reset(&mut self) {}
}

/// Feature universe, size bounds and fixed features shared by the built-in
/// strategies.
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    pub columns: Vec<FeatureId>,
    pub column_info: Arc<ColumnInfo>,
    pub min_features: usize,
    pub max_features: usize,
    pub fixed_features: BTreeSet<FeatureId>,
}

impl FeatureSpace {
    pub fn new(column_info: ColumnInfo, min_features: usize, max_features: usize, fixed_features: &[FeatureId]) -> Result<Self> {
        let n_features = column_info.len();
        if max_features < 1 || max_features > n_features {
            return Err(SelectionError::InvalidFeatureBounds(format!(
                "max_features must be smaller than {} and larger than 0, got {}",
                n_features + 1,
                max_features
            )));
        }
        if min_features > max_features {
            return Err(SelectionError::InvalidFeatureBounds(format!(
                "min_features ({}) must be <= max_features ({})",
                min_features, max_features
            )));
        }

        let mut fixed = BTreeSet::new();
        for id in fixed_features {
            if !column_info.contains(id) {
                return Err(SelectionError::UnknownFeature(id.clone()));
            }
            fixed.insert(id.clone());
        }
        if fixed.len() > max_features {
            return Err(SelectionError::InvalidFeatureBounds(format!(
                "{} fixed features exceed max_features ({})",
                fixed.len(),
                max_features
            )));
        }

        Ok(FeatureSpace {
            columns: column_info.feature_ids().to_vec(),
            column_info: Arc::new(column_info),
            min_features,
            max_features,
            fixed_features: fixed,
        })
    }

    /// Feature space over the numeric columns of `data`.
    pub fn from_dataset(data: &Dataset, min_features: usize, max_features: usize, fixed_features: &[FeatureId]) -> Result<Self> {
        let info = ColumnInfo::from_dataset(data, &CategoricalFeatures::None, None)?;
        FeatureSpace::new(info, min_features, max_features, fixed_features)
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }

    /// The fixed features if any, otherwise the first `min_features` columns.
    pub fn default_initial_state(&self) -> State {
        if self.fixed_features.is_empty() {
            self.columns.iter().take(self.min_features).cloned().collect()
        } else {
            self.fixed_features.iter().cloned().collect()
        }
    }

    /// Check `state` against the bounds and the fixed features.
    pub fn check_state(&self, state: &State) -> Result<()> {
        if let Some(unknown) = state.iter().find(|id| !self.column_info.contains(id)) {
            return Err(SelectionError::UnknownFeature(unknown.clone()));
        }
        if state.len() > self.max_features {
            return Err(SelectionError::InvalidInitialState(format!(
                "initial features should be of length <= {}",
                self.max_features
            )));
        }
        if state.len() < self.min_features {
            return Err(SelectionError::InvalidInitialState(format!(
                "initial features should be of length >= {}",
                self.min_features
            )));
        }
        if !state.contains_all(&self.fixed_features) {
            return Err(SelectionError::InvalidInitialState(format!(
                "initial features should contain the fixed features {}",
                State::new(self.fixed_features.iter().cloned())
            )));
        }
        Ok(())
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use itertools::Itertools;

use crate::columns::ColumnInfo;
use crate::data_handling::FeatureId;
use crate::error::{Result, SelectionError};
use crate::feature_selection::results::{best_entry, ResultTable};
use crate::feature_selection::state::State;
use crate::feature_selection::strategy::{FeatureSpace, RoundOutcome, SearchStrategy};

/// Every combination of `columns` with `min_features..=max_features`
/// members that contains all `fixed` features, by increasing size and then
/// in combination order.
pub fn exhaustive_candidates(
    columns: &[FeatureId],
    min_features: usize,
    max_features: usize,
    fixed: &BTreeSet<FeatureId>,
) -> Vec<State> {
    (min_features..=max_features)
        .flat_map(|k| columns.iter().cloned().combinations(k))
        .map(State::new)
        .filter(|state| state.contains_all(fixed))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fresh,
    Exhausted,
}

/// Exhaustive search: a single batch holding every admissible subset.
#[derive(Debug, Clone)]
pub struct MinMaxCandidates {
    space: FeatureSpace,
    phase: Phase,
}

impl MinMaxCandidates {
    /// Requires `1 <= min_features <= max_features <= n_features`.
    pub fn new(space: FeatureSpace) -> Result<Self> {
        if space.min_features < 1 {
            return Err(SelectionError::InvalidFeatureBounds(format!(
                "min_features must be smaller than {} and larger than 0, got {}",
                space.n_features() + 1,
                space.min_features
            )));
        }
        Ok(MinMaxCandidates {
            space,
            phase: Phase::Fresh,
        })
    }

    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    pub fn is_exhausted(&self) -> bool {
        self.phase == Phase::Exhausted
    }
}

impl SearchStrategy for MinMaxCandidates {
    fn initial_state(&self) -> State {
        self.space.default_initial_state()
    }

    fn propose(&mut self, _state: &State) -> Option<Vec<State>> {
        match self.phase {
            Phase::Exhausted => None,
            Phase::Fresh => {
                self.phase = Phase::Exhausted;
                Some(exhaustive_candidates(
                    &self.space.columns,
                    self.space.min_features,
                    self.space.max_features,
                    &self.space.fixed_features,
                ))
            }
        }
    }

    /// All admissible subsets were scored in one batch, so the best entry of
    /// the table is the answer.
    fn is_finished(&self, results: &ResultTable, _best_state: &State, _batch: &ResultTable) -> RoundOutcome {
        match best_entry(results) {
            Some((state, score)) => RoundOutcome {
                state: Some(state.clone()),
                score,
                finished: true,
            },
            None => RoundOutcome {
                state: None,
                score: f64::NAN,
                finished: true,
            },
        }
    }

    fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.space.column_info)
    }

    fn fixed_features(&self) -> &BTreeSet<FeatureId> {
        &self.space.fixed_features
    }

    fn reset(&mut self) {
        self.phase = Phase::Fresh;
    }
}

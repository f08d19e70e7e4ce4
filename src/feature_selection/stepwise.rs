use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::columns::ColumnInfo;
use crate::data_handling::FeatureId;
use crate::error::{Result, SelectionError};
use crate::feature_selection::results::{best_entry, ResultTable};
use crate::feature_selection::state::State;
use crate::feature_selection::strategy::{FeatureSpace, RoundOutcome, SearchStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
    Both,
}

impl FromStr for Direction {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "forward" => Ok(Direction::Forward),
            "backward" => Ok(Direction::Backward),
            "both" => Ok(Direction::Both),
            _ => Err(SelectionError::InvalidConfig(format!(
                "direction must be one of forward, backward, both; got {}",
                s
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Both => "both",
        };
        write!(f, "{}", name)
    }
}

/// Greedy stepwise search: each round adds and/or removes a single feature
/// and stops at the first round that does not improve the score.
#[derive(Debug, Clone)]
pub struct StepCandidates {
    space: FeatureSpace,
    direction: Direction,
    initial: State,
    explicit_initial: bool,
    random_state: u64,
}

impl StepCandidates {
    /// Requires `min_features <= max_features <= n_features`; `min_features`
    /// may be 0 so a forward search can start from the empty model.
    pub fn new(space: FeatureSpace, direction: Direction) -> Result<Self> {
        let mut step = StepCandidates {
            space,
            direction,
            initial: State::empty(),
            explicit_initial: false,
            random_state: 0,
        };
        step.initial = step.default_initial_state();
        step.space.check_state(&step.initial)?;
        Ok(step)
    }

    /// Start the search from `features` instead of the direction default.
    pub fn with_initial_features(mut self, features: &[FeatureId]) -> Result<Self> {
        let state = State::new(features.iter().cloned());
        self.space.check_state(&state)?;
        self.initial = state;
        self.explicit_initial = true;
        Ok(self)
    }

    /// Seed for the random starting subset of a backward search.
    pub fn with_random_state(mut self, seed: u64) -> Result<Self> {
        self.random_state = seed;
        if !self.explicit_initial {
            self.initial = self.default_initial_state();
            self.space.check_state(&self.initial)?;
        }
        Ok(self)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn space(&self) -> &FeatureSpace {
        &self.space
    }

    fn default_initial_state(&self) -> State {
        match self.direction {
            Direction::Forward | Direction::Both => self.space.default_initial_state(),
            Direction::Backward => self.random_initial_state(),
        }
    }

    /// The fixed features plus a seeded random draw that fills the state up
    /// to `max_features`.
    fn random_initial_state(&self) -> State {
        let fixed = &self.space.fixed_features;
        let free: Vec<&FeatureId> = self.space.columns.iter().filter(|c| !fixed.contains(*c)).collect();
        let n_draw = self.space.max_features.saturating_sub(fixed.len());
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let drawn = free.choose_multiple(&mut rng, n_draw).map(|&c| c.clone());
        fixed.iter().cloned().chain(drawn).collect()
    }

    fn forward_candidates(&self, state: &State) -> Vec<State> {
        if state.len() >= self.space.max_features {
            return Vec::new();
        }
        self.space
            .columns
            .iter()
            .filter(|c| !state.contains(c))
            .map(|c| state.with(c))
            .filter(|s| s.contains_all(&self.space.fixed_features))
            .collect()
    }

    fn backward_candidates(&self, state: &State) -> Vec<State> {
        if state.len() <= self.space.min_features {
            return Vec::new();
        }
        state
            .iter()
            .map(|c| state.without(c))
            .filter(|s| s.contains_all(&self.space.fixed_features))
            .collect()
    }
}

impl SearchStrategy for StepCandidates {
    fn initial_state(&self) -> State {
        self.initial.clone()
    }

    fn propose(&mut self, state: &State) -> Option<Vec<State>> {
        let batch = match self.direction {
            Direction::Forward => self.forward_candidates(state),
            Direction::Backward => self.backward_candidates(state),
            Direction::Both => {
                let mut batch = self.forward_candidates(state);
                batch.extend(self.backward_candidates(state));
                batch
            }
        };
        Some(batch)
    }

    /// Continue with the best candidate of the batch while it strictly beats
    /// the current best state; a tie stops the search.
    fn is_finished(&self, results: &ResultTable, best_state: &State, batch: &ResultTable) -> RoundOutcome {
        let current = results
            .get(best_state)
            .map(|entry| entry.avg_score)
            .filter(|score| !score.is_nan())
            .unwrap_or(f64::NEG_INFINITY);

        match best_entry(batch) {
            Some((state, score)) if score > current => RoundOutcome {
                state: Some(state.clone()),
                score,
                finished: false,
            },
            Some(_) => RoundOutcome {
                state: Some(best_state.clone()),
                score: current,
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
}

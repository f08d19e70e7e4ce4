//! Feature-subset search.
//!
//! One `fit` evaluates the initial state, then repeats rounds of
//! propose -> evaluate (in parallel) -> merge -> decide until the strategy
//! reports it is finished, it proposes nothing, or the cancellation token is
//! set. Rounds never overlap: each batch depends on the merged results of
//! the previous one.
pub mod evaluate;
pub mod min_max;
pub mod results;
pub mod selector;
pub mod state;
pub mod stepwise;
pub mod strategy;

pub use evaluate::{calc_score, EvalContext};
pub use min_max::{exhaustive_candidates, MinMaxCandidates};
pub use results::{best_entry, ResultTable, ScoreEntry};
pub use selector::{CancellationToken, FeatureSelector, FitStatus, RoundSummary};
pub use state::State;
pub use stepwise::{Direction, StepCandidates};
pub use strategy::{FeatureSpace, RoundOutcome, SearchStrategy};

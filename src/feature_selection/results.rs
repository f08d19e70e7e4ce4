use indexmap::IndexMap;
use serde::Serialize;

use crate::feature_selection::state::State;
use crate::stats::nanmean;

/// Scores recorded for one evaluated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub cv_scores: Vec<f64>,
    pub avg_score: f64,
}

impl ScoreEntry {
    pub fn from_scores(cv_scores: Vec<f64>) -> Self {
        let avg_score = nanmean(&cv_scores);
        ScoreEntry { cv_scores, avg_score }
    }
}

/// Every state evaluated during one search, in evaluation order.
pub type ResultTable = IndexMap<State, ScoreEntry>;

/// The state with the highest average score. Ties keep the state that was
/// evaluated first; NaN averages never win.
pub fn best_entry(table: &ResultTable) -> Option<(&State, f64)> {
    let mut best: Option<(&State, f64)> = None;
    for (state, entry) in table {
        let better = match best {
            None => !entry.avg_score.is_nan(),
            Some((_, score)) => entry.avg_score > score,
        };
        if better {
            best = Some((state, entry.avg_score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_entry_skips_nan() {
        let mut table = ResultTable::new();
        table.insert(State::from_indices(&[0]), ScoreEntry::from_scores(vec![f64::NAN]));
        table.insert(State::from_indices(&[1]), ScoreEntry::from_scores(vec![0.2, 0.4]));
        table.insert(State::from_indices(&[2]), ScoreEntry::from_scores(vec![0.3, f64::NAN]));
        let (state, score) = best_entry(&table).unwrap();
        assert_eq!(state, &State::from_indices(&[1]));
        assert!((score - 0.3).abs() < 1e-12);

        let mut nan_only = ResultTable::new();
        nan_only.insert(State::empty(), ScoreEntry::from_scores(vec![f64::NAN]));
        assert!(best_entry(&nan_only).is_none());
    }

    #[test]
    fn test_best_entry_tie_keeps_first_evaluated() {
        let mut table = ResultTable::new();
        table.insert(State::from_indices(&[1]), ScoreEntry::from_scores(vec![0.5]));
        table.insert(State::from_indices(&[0, 1]), ScoreEntry::from_scores(vec![0.5]));
        let (state, _) = best_entry(&table).unwrap();
        assert_eq!(state, &State::from_indices(&[1]));

        // re-inserting an evaluated state keeps its original position
        table.insert(State::from_indices(&[1]), ScoreEntry::from_scores(vec![0.5]));
        assert_eq!(table.get_index(0).map(|(s, _)| s), Some(&State::from_indices(&[1])));
    }
}

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Result, SelectionError};
use crate::feature_selection::results::ResultTable;
use crate::feature_selection::selector::{FeatureSelector, FitStatus, RoundSummary};
use crate::feature_selection::state::State;
use crate::stats::{confidence_bound, population_std_dev};

/// Scores of one evaluated state plus their spread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricEntry {
    pub cv_scores: Vec<f64>,
    pub avg_score: f64,
    /// Population standard deviation of `cv_scores`.
    pub std_dev: f64,
    /// Standard error of the mean (ddof = 1).
    pub std_err: f64,
    /// Half-width of the confidence interval around `avg_score`.
    pub ci_bound: f64,
}

/// Derive a `MetricEntry` for every state of `results`.
///
/// `confidence` must lie strictly between 0 and 1.
pub fn metric_dict(results: &ResultTable, confidence: f64) -> Result<BTreeMap<State, MetricEntry>> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(SelectionError::InvalidConfig(format!(
            "confidence must be in (0, 1), got {}",
            confidence
        )));
    }
    Ok(results
        .iter()
        .map(|(state, entry)| {
            let (ci_bound, std_err) = confidence_bound(&entry.cv_scores, confidence);
            let metrics = MetricEntry {
                cv_scores: entry.cv_scores.clone(),
                avg_score: entry.avg_score,
                std_dev: population_std_dev(&entry.cv_scores),
                std_err,
                ci_bound,
            };
            (state.clone(), metrics)
        })
        .collect())
}

/// One row of the serialized report.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRow {
    pub state: State,
    pub n_features: usize,
    #[serde(flatten)]
    pub metrics: MetricEntry,
}

/// Summary of a fitted search, written by the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub best_state: State,
    pub best_score: f64,
    pub best_feature_names: Vec<String>,
    pub status: FitStatus,
    pub interrupted: bool,
    pub confidence: f64,
    pub rounds: Vec<RoundSummary>,
    pub metrics: Vec<MetricRow>,
}

impl SelectionReport {
    pub fn from_selector(selector: &FeatureSelector, confidence: f64) -> Result<Self> {
        let (best_state, best_score, status) = match (selector.best_state(), selector.best_score(), selector.status()) {
            (Some(state), Some(score), Some(status)) => (state.clone(), score, status),
            _ => return Err(SelectionError::NotFitted),
        };
        let metrics = selector
            .metric_dict(confidence)?
            .into_iter()
            .map(|(state, metrics)| MetricRow {
                n_features: state.len(),
                state,
                metrics,
            })
            .collect();
        Ok(SelectionReport {
            best_state,
            best_score,
            best_feature_names: selector.feature_names()?,
            status,
            interrupted: selector.interrupted(),
            confidence,
            rounds: selector.rounds().to_vec(),
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_selection::results::ScoreEntry;

    #[test]
    fn test_metric_dict_values() {
        let mut results = ResultTable::new();
        let scores = vec![0.8, 0.9, 1.0];
        results.insert(State::from_indices(&[0]), ScoreEntry::from_scores(scores));
        let dict = metric_dict(&results, 0.95).unwrap();
        let entry = &dict[&State::from_indices(&[0])];

        assert!((entry.avg_score - 0.9).abs() < 1e-12);
        let expected_std = (0.02f64 / 3.0).sqrt();
        assert!((entry.std_dev - expected_std).abs() < 1e-12);
        let expected_sem = 0.1 / 3f64.sqrt();
        assert!((entry.std_err - expected_sem).abs() < 1e-12);
        // t(0.975, df=3) = 3.182446...
        assert!((entry.ci_bound - expected_sem * 3.182446305284263).abs() < 1e-6);
    }

    #[test]
    fn test_metric_dict_rejects_bad_confidence() {
        let results = ResultTable::new();
        assert!(metric_dict(&results, 1.0).is_err());
        assert!(metric_dict(&results, 0.0).is_err());
        assert!(metric_dict(&results, f64::NAN).is_err());
        assert!(metric_dict(&results, 0.9).unwrap().is_empty());
    }

    #[test]
    fn test_single_fold_has_undefined_spread() {
        let mut results = ResultTable::new();
        results.insert(State::empty(), ScoreEntry::from_scores(vec![0.5]));
        let dict = metric_dict(&results, 0.95).unwrap();
        let entry = &dict[&State::empty()];
        assert_eq!(entry.std_dev, 0.0);
        assert!(entry.std_err.is_nan());
        assert!(entry.ci_bound.is_nan());
    }
}

//! Integration tests for the selection driver: transform, cancellation,
//! parallel evaluation and reporting.

mod common;

use std::sync::Arc;

use common::{constant_dataset, fixed_state_score, subset_scorer, CountingEstimator};
use feature_selector::columns::{CategoricalFeatures, ColumnInfo};
use feature_selector::config::{PreDispatch, SelectorConfig};
use feature_selector::cross_validation::CvPlan;
use feature_selector::data_handling::{Dataset, FeatureId, FitParams};
use feature_selector::error::SelectionError;
use feature_selector::feature_selection::{
    CancellationToken, Direction, FeatureSelector, FeatureSpace, FitStatus, MinMaxCandidates, State,
    StepCandidates,
};
use feature_selector::models::{LinearRegression, LogisticRegression};
use ndarray::{Array1, Array2};

fn no_cv(n_jobs: i32) -> SelectorConfig {
    SelectorConfig {
        cv: CvPlan::Disabled,
        n_jobs,
        pre_dispatch: PreDispatch::Count(1),
        ..SelectorConfig::default()
    }
}

/// 40 rows; `y` depends on columns "a" and "c" only.
fn regression_data() -> (Dataset, Array1<f64>) {
    let n = 40;
    let x = Array2::from_shape_fn((n, 4), |(i, j)| match j {
        0 => i as f64,
        1 => ((i * 7) % 5) as f64,
        2 => ((i * 3) % 8) as f64,
        _ => ((i * 11) % 13) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| 2.0 * x[(i, 0)] - 3.0 * x[(i, 2)] + 1.0);
    let labels = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
    (Dataset::with_labels(x, labels).unwrap(), y)
}

// ---------------------------------------------------------------------------
// transform / fit_transform
// ---------------------------------------------------------------------------

#[test]
fn fit_transform_matches_fit_then_transform() {
    let (data, y) = regression_data();
    let build = || {
        let space = FeatureSpace::from_dataset(&data, 1, 2, &[]).unwrap();
        FeatureSelector::new(
            Box::new(LinearRegression::default()),
            Box::new(MinMaxCandidates::new(space).unwrap()),
            &SelectorConfig::default(),
        )
        .unwrap()
    };

    let mut a = build();
    let transformed = a.fit_transform(&data, &y, None, &FitParams::default()).unwrap();

    let mut b = build();
    b.fit(&data, &y, None, &FitParams::default()).unwrap();
    assert_eq!(transformed, b.transform(&data).unwrap());

    assert_eq!(a.best_state(), Some(&State::from_labels(&["a", "c"])));
    assert_eq!(transformed.ncols(), 2);
    assert_eq!(a.feature_names().unwrap(), vec!["a".to_string(), "c".to_string()]);
}

#[test]
fn transform_and_metrics_require_fit() {
    let (data, _) = regression_data();
    let space = FeatureSpace::from_dataset(&data, 1, 2, &[]).unwrap();
    let selector = FeatureSelector::new(
        Box::new(LinearRegression::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &SelectorConfig::default(),
    )
    .unwrap();
    assert_eq!(selector.transform(&data).unwrap_err(), SelectionError::NotFitted);
    assert_eq!(selector.metric_dict(0.95).unwrap_err(), SelectionError::NotFitted);
    assert_eq!(selector.feature_names().unwrap_err(), SelectionError::NotFitted);
    assert_eq!(selector.status(), None);
}

#[test]
fn categorical_feature_expands_to_several_columns() {
    let n = 30;
    let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { (i % 3) as f64 } else { i as f64 });
    let y = Array1::from_shape_fn(n, |i| [0.0, 5.0, -5.0][i % 3]);
    let data = Dataset::with_labels(x, vec!["color".to_string(), "t".to_string()]).unwrap();

    let info = ColumnInfo::from_dataset(&data, &CategoricalFeatures::Indices(vec![0]), None).unwrap();
    let space = FeatureSpace::new(info, 1, 1, &[]).unwrap();
    let mut selector = FeatureSelector::new(
        Box::new(LinearRegression::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &SelectorConfig::default(),
    )
    .unwrap();
    let reduced = selector.fit_transform(&data, &y, None, &FitParams::default()).unwrap();

    assert_eq!(selector.best_state(), Some(&State::from_labels(&["color"])));
    assert_eq!(reduced.ncols(), 2);
    assert_eq!(
        selector.feature_names().unwrap(),
        vec!["color[1]".to_string(), "color[2]".to_string()]
    );
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[test]
fn cancellation_before_fit_keeps_only_initial_state() {
    let (data, y) = constant_dataset(10, 4);
    let space = FeatureSpace::from_dataset(&data, 1, 2, &[]).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let mut selector = FeatureSelector::new(
        Box::new(CountingEstimator::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &no_cv(1),
    )
    .unwrap()
    .with_scorer(subset_scorer(|f| f.len() as f64))
    .with_cancellation(token);
    selector.fit(&data, &y, None, &FitParams::default()).unwrap();

    assert!(selector.interrupted());
    assert_eq!(selector.status(), Some(FitStatus::Interrupted));
    assert_eq!(selector.results().len(), 1);
    assert_eq!(selector.best_state(), Some(&State::from_indices(&[0])));
    assert!(selector.rounds().is_empty());
    assert!(selector.transform(&data).is_ok());
}

#[test]
fn cancellation_mid_batch_discards_partial_round() {
    let (data, y) = constant_dataset(10, 5);
    let space = FeatureSpace::from_dataset(&data, 0, 5, &[]).unwrap();
    let token = CancellationToken::new();
    let trigger = token.clone();
    // the first pair evaluated in round 2 asks the search to stop
    let scorer = subset_scorer(move |f| {
        if f.len() == 2 {
            trigger.cancel();
        }
        fixed_state_score(f, 3, -0.5)
    });
    let mut selector = FeatureSelector::new(
        Box::new(CountingEstimator::default()),
        Box::new(StepCandidates::new(space, Direction::Forward).unwrap()),
        &no_cv(1),
    )
    .unwrap()
    .with_scorer(scorer)
    .with_cancellation(token);
    selector.fit(&data, &y, None, &FitParams::default()).unwrap();

    assert!(selector.interrupted());
    assert_eq!(selector.rounds().len(), 1);
    // empty state + 5 singletons; round 2 was dropped
    assert_eq!(selector.results().len(), 6);
    assert!(selector.results().keys().all(|s| s.len() <= 1));
    assert_eq!(selector.best_state(), Some(&State::from_indices(&[3])));
}

// ---------------------------------------------------------------------------
// Parallel evaluation
// ---------------------------------------------------------------------------

#[test]
fn parallel_evaluation_matches_sequential() {
    let (data, y) = regression_data();
    let run = |n_jobs: i32, pre_dispatch: PreDispatch| {
        let space = FeatureSpace::from_dataset(&data, 0, 2, &[]).unwrap();
        let config = SelectorConfig {
            n_jobs,
            pre_dispatch,
            cv: CvPlan::KFold(4),
            scoring: Some("neg_mean_squared_error".to_string()),
            ..SelectorConfig::default()
        };
        let mut selector = FeatureSelector::new(
            Box::new(LinearRegression::default()),
            Box::new(StepCandidates::new(space, Direction::Both).unwrap()),
            &config,
        )
        .unwrap();
        selector.fit(&data, &y, None, &FitParams::default()).unwrap();
        (selector.results().clone(), selector.best_state().cloned())
    };

    let (sequential, best_seq) = run(1, PreDispatch::default());
    let (parallel, best_par) = run(2, PreDispatch::All);
    let (chunked, best_chunked) = run(2, PreDispatch::Count(3));
    assert_eq!(sequential.keys().collect::<Vec<_>>(), parallel.keys().collect::<Vec<_>>());
    assert_eq!(sequential.keys().collect::<Vec<_>>(), chunked.keys().collect::<Vec<_>>());
    assert_eq!(best_seq, best_par);
    assert_eq!(best_seq, best_chunked);
    assert_eq!(best_seq, Some(State::from_labels(&["a", "c"])));
}

// ---------------------------------------------------------------------------
// Grouped cross-validation and fit parameters
// ---------------------------------------------------------------------------

#[test]
fn groups_and_sample_weights_are_forwarded() {
    let (data, y) = regression_data();
    let groups: Vec<i64> = (0..40).map(|i| i / 5).collect();
    let weights = Array1::from_shape_fn(40, |i| 1.0 + (i % 2) as f64);
    let params = FitParams::default().with_sample_weight(weights);

    let space = FeatureSpace::from_dataset(&data, 1, 2, &[FeatureId::from("a")]).unwrap();
    let config = SelectorConfig {
        cv: CvPlan::KFold(4),
        ..SelectorConfig::default()
    };
    let mut selector = FeatureSelector::new(
        Box::new(LinearRegression::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &config,
    )
    .unwrap();
    selector.fit(&data, &y, Some(&groups), &params).unwrap();
    assert_eq!(selector.best_state(), Some(&State::from_labels(&["a", "c"])));
    assert!(selector.results().values().all(|e| e.cv_scores.len() == 4));

    let short_groups = vec![0i64; 3];
    assert!(matches!(
        selector.fit(&data, &y, Some(&short_groups), &params),
        Err(SelectionError::ShapeMismatch(_))
    ));
}

#[test]
fn classifier_uses_accuracy_by_default() {
    let n = 60;
    let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
        0 => ((i * 7) % 10) as f64,
        1 => (i % 2) as f64 * 4.0 - 2.0,
        _ => ((i * 3) % 5) as f64,
    });
    let y = Array1::from_shape_fn(n, |i| (i % 2) as f64);
    let data = Dataset::new(x);
    let space = FeatureSpace::from_dataset(&data, 1, 1, &[]).unwrap();
    let mut selector = FeatureSelector::new(
        Box::new(LogisticRegression::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &SelectorConfig::default(),
    )
    .unwrap();
    assert_eq!(selector.scorer().name(), "accuracy");
    selector.fit(&data, &y, None, &FitParams::default()).unwrap();
    assert_eq!(selector.best_state(), Some(&State::from_indices(&[1])));
    assert_eq!(selector.best_score(), Some(1.0));
}

#[test]
fn custom_submodel_builder_is_used() {
    let (data, y) = constant_dataset(10, 3);
    let space = FeatureSpace::from_dataset(&data, 1, 1, &[]).unwrap();
    // reverse the numbering: feature j is built from column 2 - j
    let mut info = ColumnInfo::from_dataset(&data, &CategoricalFeatures::None, None).unwrap();
    let encoders: Vec<_> = (0..3)
        .map(|j| info.get(&FeatureId::Index(2 - j)).map(Arc::clone).unwrap())
        .collect();
    for (j, encoder) in encoders.into_iter().enumerate() {
        info.insert(FeatureId::Index(j), encoder);
    }
    let mut selector = FeatureSelector::new(
        Box::new(CountingEstimator::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &no_cv(1),
    )
    .unwrap()
    .with_scorer(subset_scorer(|f| f[0] as f64))
    .with_submodel_builder(Arc::new(info));
    selector.fit(&data, &y, None, &FitParams::default()).unwrap();
    assert_eq!(selector.best_state(), Some(&State::from_indices(&[0])));
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[test]
fn metric_dict_covers_every_result() {
    let (data, y) = regression_data();
    let space = FeatureSpace::from_dataset(&data, 1, 2, &[]).unwrap();
    let mut selector = FeatureSelector::new(
        Box::new(LinearRegression::default()),
        Box::new(MinMaxCandidates::new(space).unwrap()),
        &SelectorConfig::default(),
    )
    .unwrap();
    selector.fit(&data, &y, None, &FitParams::default()).unwrap();

    let metrics = selector.metric_dict(0.9).unwrap();
    assert_eq!(metrics.len(), selector.results().len());
    for (state, entry) in &metrics {
        let stored = &selector.results()[state];
        assert_eq!(entry.cv_scores, stored.cv_scores);
        assert_eq!(entry.cv_scores.len(), 5);
        assert!(entry.std_dev >= 0.0);
        assert!(entry.ci_bound >= 0.0 || entry.ci_bound.is_nan());
    }
    assert!(matches!(selector.metric_dict(1.5), Err(SelectionError::InvalidConfig(_))));
}

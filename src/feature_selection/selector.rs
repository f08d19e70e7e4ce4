use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{Array1, Array2};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::Serialize;

use crate::columns::SubmodelBuilder;
use crate::config::SelectorConfig;
use crate::cross_validation::CvPlan;
use crate::data_handling::{Dataset, FitParams};
use crate::error::{Result, SelectionError};
use crate::feature_selection::evaluate::{calc_score, EvalContext};
use crate::feature_selection::results::{best_entry, ResultTable, ScoreEntry};
use crate::feature_selection::state::State;
use crate::feature_selection::strategy::SearchStrategy;
use crate::models::Estimator;
use crate::report::{metric_dict, MetricEntry};
use crate::scoring::Scorer;

/// Shared flag that asks a running `fit` to stop at the next round boundary.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How the last `fit` ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStatus {
    Converged,
    Interrupted,
}

/// Bookkeeping for one completed round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSummary {
    pub round: usize,
    pub n_candidates: usize,
    /// State chosen by the strategy for this round.
    pub state: Option<State>,
    pub score: f64,
    /// Best score after the round.
    pub best_score: f64,
    pub finished: bool,
}

/// `new` beats `current` when strictly greater; anything beats NaN.
fn improves(new: f64, current: f64) -> bool {
    !new.is_nan() && (current.is_nan() || new > current)
}

/// Search driver: evaluates the initial state, then runs
/// propose / evaluate / merge / decide rounds until the strategy is done,
/// the batch is empty or the cancellation token fires.
pub struct FeatureSelector {
    estimator: Box<dyn Estimator>,
    strategy: Box<dyn SearchStrategy>,
    submodel_builder: Option<Arc<dyn SubmodelBuilder>>,
    initial_state: Option<State>,
    scorer: Scorer,
    cv: CvPlan,
    n_jobs: usize,
    chunk_size: Option<usize>,
    verbose: u8,
    pool: ThreadPool,
    cancel: CancellationToken,

    results: ResultTable,
    best: Option<(State, f64)>,
    status: Option<FitStatus>,
    rounds: Vec<RoundSummary>,
    fitted_builder: Option<Arc<dyn SubmodelBuilder>>,
}

impl FeatureSelector {
    /// Validate the configuration and build the worker pool.
    ///
    /// Without `config.scoring` the scorer follows the estimator kind, so an
    /// estimator that is neither classifier nor regressor is rejected here;
    /// use `with_custom_scorer` for those.
    pub fn new(
        estimator: Box<dyn Estimator>,
        strategy: Box<dyn SearchStrategy>,
        config: &SelectorConfig,
    ) -> Result<Self> {
        Self::build(estimator, strategy, config, None)
    }

    /// Like `new`, scoring every candidate with `scorer`. `config.scoring`
    /// is ignored and any estimator kind is accepted.
    pub fn with_custom_scorer(
        estimator: Box<dyn Estimator>,
        strategy: Box<dyn SearchStrategy>,
        config: &SelectorConfig,
        scorer: Scorer,
    ) -> Result<Self> {
        Self::build(estimator, strategy, config, Some(scorer))
    }

    fn build(
        estimator: Box<dyn Estimator>,
        strategy: Box<dyn SearchStrategy>,
        config: &SelectorConfig,
        scorer: Option<Scorer>,
    ) -> Result<Self> {
        let scorer = match (scorer, &config.scoring) {
            (Some(scorer), _) => scorer,
            (None, Some(name)) => Scorer::from_name(name)?,
            (None, None) => Scorer::default_for(estimator.as_ref())?,
        };
        config.cv.validate()?;
        let n_jobs = config.resolve_n_jobs()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(n_jobs)
            .build()
            .map_err(|e| SelectionError::ThreadPool(e.to_string()))?;

        Ok(FeatureSelector {
            estimator,
            strategy,
            submodel_builder: None,
            initial_state: None,
            scorer,
            cv: config.cv.clone(),
            n_jobs,
            chunk_size: config.pre_dispatch.chunk_size(n_jobs),
            verbose: config.verbose,
            pool,
            cancel: CancellationToken::new(),
            results: ResultTable::new(),
            best: None,
            status: None,
            rounds: Vec::new(),
            fitted_builder: None,
        })
    }

    /// Start from `state` instead of the strategy's initial state.
    pub fn with_initial_state(mut self, state: State) -> Self {
        self.initial_state = Some(state);
        self
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Build design matrices with `builder` instead of the strategy's column info.
    pub fn with_submodel_builder(mut self, builder: Arc<dyn SubmodelBuilder>) -> Self {
        self.submodel_builder = Some(builder);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    /// Run the search on `data` and targets `y`.
    ///
    /// `groups` feeds grouped k-fold splitting; `fit_params` are forwarded to
    /// every `Estimator::fit` call. A cancelled search still post-processes
    /// the rounds that completed and reports `FitStatus::Interrupted`.
    pub fn fit(
        &mut self,
        data: &Dataset,
        y: &Array1<f64>,
        groups: Option<&[i64]>,
        fit_params: &FitParams,
    ) -> Result<&mut Self> {
        if y.len() != data.n_samples() {
            return Err(SelectionError::ShapeMismatch(format!(
                "y has {} entries for {} samples",
                y.len(),
                data.n_samples()
            )));
        }
        fit_params.check_samples(data.n_samples())?;

        self.results.clear();
        self.best = None;
        self.status = None;
        self.rounds.clear();
        self.fitted_builder = None;
        self.strategy.reset();

        if self.verbose > 0 {
            data.log_input_data_summary();
        }

        let builder: Arc<dyn SubmodelBuilder> = match &self.submodel_builder {
            Some(b) => Arc::clone(b),
            None => self.strategy.column_info() as Arc<dyn SubmodelBuilder>,
        };
        let splits = self.cv.resolve(y, groups, self.estimator.kind())?;

        let initial = self
            .initial_state
            .clone()
            .unwrap_or_else(|| self.strategy.initial_state());
        if !initial.contains_all(self.strategy.fixed_features()) {
            return Err(SelectionError::InvalidInitialState(format!(
                "{} does not contain every fixed feature",
                initial
            )));
        }

        let ctx = EvalContext {
            template: self.estimator.as_ref(),
            builder: builder.as_ref(),
            data,
            y,
            splits: splits.as_deref(),
            scorer: &self.scorer,
            fit_params,
        };

        let (initial, scores) = self.pool.install(|| calc_score(&ctx, initial))?;
        let entry = ScoreEntry::from_scores(scores);
        let mut best_state = initial.clone();
        let mut best_score = entry.avg_score;
        self.results.insert(initial.clone(), entry);

        let mut reference = initial;
        let mut status = FitStatus::Converged;
        let mut round = 0;
        loop {
            if self.cancel.is_cancelled() {
                status = FitStatus::Interrupted;
                break;
            }
            let batch = match self.strategy.propose(&reference) {
                Some(batch) if !batch.is_empty() => batch,
                _ => break,
            };
            round += 1;
            let n_candidates = batch.len();

            let batch_results = match evaluate_batch(&self.pool, &ctx, batch, self.chunk_size, &self.cancel)? {
                Some(table) => table,
                None => {
                    status = FitStatus::Interrupted;
                    break;
                }
            };
            for (state, entry) in &batch_results {
                self.results.insert(state.clone(), entry.clone());
            }

            let outcome = self.strategy.is_finished(&self.results, &best_state, &batch_results);
            if let Some(state) = &outcome.state {
                if improves(outcome.score, best_score) {
                    best_state = state.clone();
                    best_score = outcome.score;
                }
                reference = state.clone();
            }

            self.log_round(round, n_candidates, outcome.state.as_ref(), outcome.score);
            self.rounds.push(RoundSummary {
                round,
                n_candidates,
                state: outcome.state.clone(),
                score: outcome.score,
                best_score,
                finished: outcome.finished,
            });

            if outcome.finished || outcome.state.is_none() {
                break;
            }
        }

        if status == FitStatus::Interrupted {
            log::warn!(
                "stopping early after {} completed round(s); returning the best state found so far",
                self.rounds.len()
            );
        }

        // Re-derive the best state from everything that was evaluated.
        let (state, score) = match best_entry(&self.results) {
            Some((state, score)) => (state.clone(), score),
            None => return Err(SelectionError::NoValidScore),
        };
        if improves(score, best_score) {
            log::debug!("post-processing improved best score {} -> {}", best_score, score);
        }
        log::debug!("best state {} with score {}", state, score);

        self.best = Some((state, score));
        self.status = Some(status);
        self.fitted_builder = Some(builder);
        Ok(self)
    }

    fn log_round(&self, round: usize, n_candidates: usize, state: Option<&State>, score: f64) {
        if self.verbose == 0 {
            return;
        }
        let n_features = state.map(State::len).unwrap_or(0);
        log::info!(
            "Round {}: evaluated {} candidates, {} features selected",
            round,
            n_candidates,
            n_features
        );
        if self.verbose > 1 {
            let cv_scores = state
                .and_then(|s| self.results.get(s))
                .map(|e| e.cv_scores.clone())
                .unwrap_or_default();
            log::info!(
                "[{}] Round {}: state {} cv_scores {:?} avg_score {:.6}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                round,
                state.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
                cv_scores,
                score
            );
        }
    }

    /// Reduce `data` to the columns of the best state.
    pub fn transform(&self, data: &Dataset) -> Result<Array2<f64>> {
        match (&self.fitted_builder, &self.best) {
            (Some(builder), Some((state, _))) => builder.build_submodel(data, state),
            _ => Err(SelectionError::NotFitted),
        }
    }

    pub fn fit_transform(
        &mut self,
        data: &Dataset,
        y: &Array1<f64>,
        groups: Option<&[i64]>,
        fit_params: &FitParams,
    ) -> Result<Array2<f64>> {
        self.fit(data, y, groups, fit_params)?;
        self.transform(data)
    }

    /// Per-state scores with std-dev, standard error and a t-based
    /// confidence bound at `confidence`.
    pub fn metric_dict(&self, confidence: f64) -> Result<BTreeMap<State, MetricEntry>> {
        if !self.is_fitted() {
            return Err(SelectionError::NotFitted);
        }
        metric_dict(&self.results, confidence)
    }

    /// Design column names of the best state.
    pub fn feature_names(&self) -> Result<Vec<String>> {
        let state = self.best_state().ok_or(SelectionError::NotFitted)?;
        self.strategy.column_info().feature_names(state)
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    pub fn best_state(&self) -> Option<&State> {
        self.best.as_ref().map(|(state, _)| state)
    }

    pub fn best_score(&self) -> Option<f64> {
        self.best.as_ref().map(|(_, score)| *score)
    }

    pub fn status(&self) -> Option<FitStatus> {
        self.status
    }

    pub fn interrupted(&self) -> bool {
        self.status == Some(FitStatus::Interrupted)
    }

    pub fn is_fitted(&self) -> bool {
        self.status.is_some()
    }

    pub fn rounds(&self) -> &[RoundSummary] {
        &self.rounds
    }
}

/// Score one batch on the pool, `chunk_size` candidates at a time. Returns
/// `None` when cancelled between chunks; the partial batch is dropped.
fn evaluate_batch(
    pool: &ThreadPool,
    ctx: &EvalContext<'_>,
    batch: Vec<State>,
    chunk_size: Option<usize>,
    cancel: &CancellationToken,
) -> Result<Option<ResultTable>> {
    let chunk_size = chunk_size.unwrap_or(batch.len()).max(1);
    let mut table = ResultTable::new();
    for (i, chunk) in batch.chunks(chunk_size).enumerate() {
        if i > 0 && cancel.is_cancelled() {
            return Ok(None);
        }
        let scored: Vec<(State, Vec<f64>)> = pool.install(|| {
            chunk
                .par_iter()
                .map(|state| calc_score(ctx, state.clone()))
                .collect::<Result<Vec<_>>>()
        })?;
        for (state, scores) in scored {
            table.insert(state, ScoreEntry::from_scores(scores));
        }
    }
    Ok(Some(table))
}

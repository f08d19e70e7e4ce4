//! Cross-validation plans and cross-validated scoring.
//!
//! The plan is resolved into concrete train/test index splits once per
//! search; every candidate state is then scored on the same splits.
use std::collections::BTreeMap;

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::data_handling::FitParams;
use crate::error::{Result, SelectionError};
use crate::models::{Estimator, EstimatorKind};
use crate::scoring::Scorer;

/// Train/test row indices of one fold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvPlan {
    /// Fit and score once on the full data.
    Disabled,
    /// `k` folds: grouped when groups are given, stratified for
    /// classifiers, contiguous otherwise.
    KFold(usize),
    /// Explicit, reusable splits.
    Splits(Vec<Split>),
}

impl Default for CvPlan {
    fn default() -> Self {
        CvPlan::KFold(5)
    }
}

impl CvPlan {
    /// `0` disables cross-validation.
    pub fn from_folds(n_splits: usize) -> Self {
        if n_splits == 0 {
            CvPlan::Disabled
        } else {
            CvPlan::KFold(n_splits)
        }
    }

    /// Collect splits into an owned plan that can be replayed for every
    /// candidate.
    pub fn from_splits<I>(splits: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Vec<usize>, Vec<usize>)>,
    {
        let splits: Vec<Split> = splits
            .into_iter()
            .map(|(train, test)| Split { train, test })
            .collect();
        if splits.is_empty() {
            return Err(SelectionError::InvalidCrossValidation(
                "no train/test splits were provided".to_string(),
            ));
        }
        Ok(CvPlan::Splits(splits))
    }

    /// Construction-time checks that do not need the data.
    pub fn validate(&self) -> Result<()> {
        match self {
            CvPlan::KFold(k) if *k < 2 => Err(SelectionError::InvalidCrossValidation(format!(
                "k-fold cross-validation needs at least 2 folds, got {}",
                k
            ))),
            CvPlan::Splits(splits) if splits.is_empty() => Err(SelectionError::InvalidCrossValidation(
                "no train/test splits were provided".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Concrete splits for this data, or `None` when disabled.
    pub fn resolve(&self, y: &Array1<f64>, groups: Option<&[i64]>, kind: EstimatorKind) -> Result<Option<Vec<Split>>> {
        let n_samples = y.len();
        if let Some(g) = groups {
            if g.len() != n_samples {
                return Err(SelectionError::ShapeMismatch(format!(
                    "groups has {} entries for {} samples",
                    g.len(),
                    n_samples
                )));
            }
        }
        match self {
            CvPlan::Disabled => Ok(None),
            CvPlan::KFold(k) => {
                let splits = match (groups, kind) {
                    (Some(g), _) => group_kfold(g, *k)?,
                    (None, EstimatorKind::Classifier) => stratified_kfold(y, *k)?,
                    (None, _) => kfold(n_samples, *k)?,
                };
                Ok(Some(splits))
            }
            CvPlan::Splits(splits) => {
                for (i, split) in splits.iter().enumerate() {
                    if split.train.is_empty() || split.test.is_empty() {
                        return Err(SelectionError::InvalidCrossValidation(format!("split {} is empty", i)));
                    }
                    if let Some(&bad) = split.train.iter().chain(&split.test).find(|&&idx| idx >= n_samples) {
                        return Err(SelectionError::InvalidCrossValidation(format!(
                            "split {} references row {} but there are {} samples",
                            i, bad, n_samples
                        )));
                    }
                }
                Ok(Some(splits.clone()))
            }
        }
    }
}

fn check_n_splits(n_splits: usize, n_items: usize, what: &str) -> Result<()> {
    if n_splits < 2 {
        return Err(SelectionError::InvalidCrossValidation(format!(
            "k-fold cross-validation needs at least 2 folds, got {}",
            n_splits
        )));
    }
    if n_splits > n_items {
        return Err(SelectionError::InvalidCrossValidation(format!(
            "cannot make {} folds from {} {}",
            n_splits, n_items, what
        )));
    }
    Ok(())
}

/// Splits from a fold assignment (`fold_of[i]` = test fold of row `i`).
fn splits_from_assignment(fold_of: &[usize], n_splits: usize) -> Vec<Split> {
    (0..n_splits)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) = (0..fold_of.len()).partition(|&i| fold_of[i] == fold);
            Split { train, test }
        })
        .collect()
}

/// Contiguous folds; the first `n % k` folds get one extra row.
pub fn kfold(n_samples: usize, n_splits: usize) -> Result<Vec<Split>> {
    check_n_splits(n_splits, n_samples, "samples")?;
    let base = n_samples / n_splits;
    let extra = n_samples % n_splits;
    let mut fold_of = Vec::with_capacity(n_samples);
    for fold in 0..n_splits {
        let size = base + usize::from(fold < extra);
        fold_of.extend(std::iter::repeat(fold).take(size));
    }
    Ok(splits_from_assignment(&fold_of, n_splits))
}

/// Folds that preserve class proportions: the rows of each class are dealt
/// round-robin across folds in order of appearance.
pub fn stratified_kfold(y: &Array1<f64>, n_splits: usize) -> Result<Vec<Split>> {
    check_n_splits(n_splits, y.len(), "samples")?;
    let mut by_class: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for (i, v) in y.iter().enumerate() {
        by_class.entry(v.to_bits()).or_default().push(i);
    }
    let mut fold_of = vec![0; y.len()];
    let mut next = 0;
    for rows in by_class.values() {
        for &row in rows {
            fold_of[row] = next % n_splits;
            next += 1;
        }
    }
    Ok(splits_from_assignment(&fold_of, n_splits))
}

/// Folds that never split a group: groups are assigned, largest first, to
/// the fold with the fewest rows so far.
pub fn group_kfold(groups: &[i64], n_splits: usize) -> Result<Vec<Split>> {
    let mut sizes: BTreeMap<i64, usize> = BTreeMap::new();
    for &g in groups {
        *sizes.entry(g).or_default() += 1;
    }
    check_n_splits(n_splits, sizes.len(), "groups")?;

    let mut ordered: Vec<(i64, usize)> = sizes.into_iter().collect();
    ordered.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut fold_rows = vec![0usize; n_splits];
    let mut fold_of_group = BTreeMap::new();
    for (group, size) in ordered {
        let lightest = (0..n_splits).min_by_key(|&f| (fold_rows[f], f)).unwrap_or(0);
        fold_rows[lightest] += size;
        fold_of_group.insert(group, lightest);
    }
    let fold_of: Vec<usize> = groups.iter().map(|g| fold_of_group[g]).collect();
    Ok(splits_from_assignment(&fold_of, n_splits))
}

/// Score one estimator per split: clone the template, fit on the training
/// rows, score on the test rows.
pub fn cross_val_score(
    template: &dyn Estimator,
    x: &Array2<f64>,
    y: &Array1<f64>,
    splits: &[Split],
    scorer: &Scorer,
    fit_params: &FitParams,
) -> Result<Vec<f64>> {
    let mut scores = Vec::with_capacity(splits.len());
    for split in splits {
        let mut estimator = template.boxed_clone();
        let x_train = x.select(Axis(0), &split.train);
        let y_train = y.select(Axis(0), &split.train);
        estimator.fit(&x_train, &y_train, &fit_params.select_rows(&split.train))?;

        let x_test = x.select(Axis(0), &split.test);
        let y_test = y.select(Axis(0), &split.test);
        scores.push(scorer.score(estimator.as_ref(), &x_test, &y_test)?);
    }
    Ok(scores)
}

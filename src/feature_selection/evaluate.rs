use ndarray::Array1;

use crate::columns::SubmodelBuilder;
use crate::cross_validation::{cross_val_score, Split};
use crate::data_handling::{Dataset, FitParams};
use crate::error::Result;
use crate::feature_selection::state::State;
use crate::models::Estimator;
use crate::scoring::Scorer;

/// Everything an evaluation needs besides the state itself. Shared read-only
/// by every worker of a round.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub template: &'a dyn Estimator,
    pub builder: &'a dyn SubmodelBuilder,
    pub data: &'a Dataset,
    pub y: &'a Array1<f64>,
    /// Resolved folds; `None` fits and scores once on the full data.
    pub splits: Option<&'a [Split]>,
    pub scorer: &'a Scorer,
    pub fit_params: &'a FitParams,
}

/// Score one candidate state.
///
/// The state is handed back with its scores so results can be matched to
/// candidates regardless of completion order.
pub fn calc_score(ctx: &EvalContext<'_>, state: State) -> Result<(State, Vec<f64>)> {
    let x = ctx.builder.build_submodel(ctx.data, &state)?;
    let scores = match ctx.splits {
        Some(splits) => cross_val_score(ctx.template, &x, ctx.y, splits, ctx.scorer, ctx.fit_params)?,
        None => {
            let mut estimator = ctx.template.boxed_clone();
            estimator.fit(&x, ctx.y, ctx.fit_params)?;
            vec![ctx.scorer.score(estimator.as_ref(), &x, ctx.y)?]
        }
    };
    log::trace!("scored {} on {} columns: {:?}", state, x.ncols(), scores);
    Ok((state, scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::{CategoricalFeatures, ColumnInfo};
    use crate::cross_validation::kfold;
    use crate::error::SelectionError;
    use crate::models::LinearRegression;
    use ndarray::{Array2, Axis};

    fn linear_data() -> (Dataset, Array1<f64>) {
        let n = 20;
        let mut x = Array2::zeros((n, 3));
        for i in 0..n {
            x[[i, 0]] = i as f64;
            x[[i, 1]] = ((i * 7) % 5) as f64;
            x[[i, 2]] = ((i * 3) % 4) as f64;
        }
        let y = x.index_axis(Axis(1), 0).mapv(|v| 2.0 * v + 1.0);
        (Dataset::new(x), y)
    }

    #[test]
    fn test_calc_score_without_cv_returns_one_score() {
        let (data, y) = linear_data();
        let info = ColumnInfo::from_dataset(&data, &CategoricalFeatures::None, None).unwrap();
        let model = LinearRegression::default();
        let ctx = EvalContext {
            template: &model,
            builder: &info,
            data: &data,
            y: &y,
            splits: None,
            scorer: &Scorer::R2,
            fit_params: &FitParams::default(),
        };
        let state = State::from_indices(&[0]);
        let (returned, scores) = calc_score(&ctx, state.clone()).unwrap();
        assert_eq!(returned, state);
        assert_eq!(scores.len(), 1);
        assert!((scores[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_calc_score_with_cv_returns_one_score_per_fold() {
        let (data, y) = linear_data();
        let info = ColumnInfo::from_dataset(&data, &CategoricalFeatures::None, None).unwrap();
        let model = LinearRegression::default();
        let splits = kfold(20, 4).unwrap();
        let ctx = EvalContext {
            template: &model,
            builder: &info,
            data: &data,
            y: &y,
            splits: Some(&splits),
            scorer: &Scorer::NegMeanSquaredError,
            fit_params: &FitParams::default(),
        };
        let (_, scores) = calc_score(&ctx, State::from_indices(&[0, 2])).unwrap();
        assert_eq!(scores.len(), 4);
        assert!(scores.iter().all(|s| s.abs() < 1e-6));

        let unknown = calc_score(&ctx, State::from_indices(&[7]));
        assert!(matches!(unknown, Err(SelectionError::UnknownFeature(_))));
    }
}

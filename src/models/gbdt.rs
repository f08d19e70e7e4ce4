use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use ndarray::{Array1, Array2};

use crate::data_handling::FitParams;
use crate::error::{Result, SelectionError};
use crate::models::estimator::{check_fit_input, class_labels, sample_weights, Estimator, EstimatorKind};

/// Hyper-parameters of the gradient boosted trees.
#[derive(Debug, Clone)]
pub struct GbdtParams {
    pub learning_rate: f32,
    pub max_depth: u32,
    pub num_boost_round: u32,
    pub training_optimization_level: u8,
}

impl Default for GbdtParams {
    fn default() -> Self {
        GbdtParams {
            learning_rate: 0.1,
            max_depth: 6,
            num_boost_round: 50,
            training_optimization_level: 2,
        }
    }
}

enum Fitted {
    Trees { model: GBDT, classes: Option<(f64, f64)> },
    /// Zero input columns or a single class: predict a constant.
    Constant(f64),
}

/// Gradient Boosting Decision Tree (GBDT) estimator, as classifier
/// (binary, log-likelihood loss) or regressor (squared error).
pub struct GbdtEstimator {
    params: GbdtParams,
    kind: EstimatorKind,
    fitted: Option<Fitted>,
}

impl GbdtEstimator {
    pub fn classifier(params: GbdtParams) -> Self {
        GbdtEstimator {
            params,
            kind: EstimatorKind::Classifier,
            fitted: None,
        }
    }

    pub fn regressor(params: GbdtParams) -> Self {
        GbdtEstimator {
            params,
            kind: EstimatorKind::Regressor,
            fitted: None,
        }
    }

    fn to_data_vec(x: &Array2<f64>) -> DataVec {
        let mut test_x = DataVec::new();
        for row in x.rows() {
            let test_row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            test_x.push(Data::new_test_data(test_row, None));
        }
        test_x
    }
}

impl Estimator for GbdtEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>, params: &FitParams) -> Result<()> {
        check_fit_input(x, y, params)?;
        let weights = sample_weights(params, x.nrows());

        let classes = if self.kind == EstimatorKind::Classifier {
            match class_labels(y).as_slice() {
                [only] => {
                    self.fitted = Some(Fitted::Constant(*only));
                    return Ok(());
                }
                [neg, pos] => Some((*neg, *pos)),
                other => {
                    return Err(SelectionError::Estimator(format!(
                        "GBDT classifier expects 2 classes, got {}",
                        other.len()
                    )))
                }
            }
        } else {
            None
        };

        if x.ncols() == 0 {
            let constant = match classes {
                Some((neg, pos)) => {
                    let pos_weight: f64 = y.iter().zip(weights.iter()).filter(|&(&v, _)| v == pos).map(|(_, &w)| w).sum();
                    if pos_weight * 2.0 >= weights.sum() { pos } else { neg }
                }
                None => weights.dot(y) / weights.sum(),
            };
            self.fitted = Some(Fitted::Constant(constant));
            return Ok(());
        }

        let mut config = Config::new();
        config.set_feature_size(x.ncols());
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.num_boost_round as usize);
        config.set_debug(false);
        config.set_training_optimization_level(self.params.training_optimization_level);
        config.set_loss(if classes.is_some() { "LogLikelyhood" } else { "SquaredError" });

        let mut gbdt = GBDT::new(&config);

        let mut train_x = DataVec::new();
        for (i, row) in x.rows().into_iter().enumerate() {
            let train_row: Vec<f32> = row.iter().map(|&v| v as f32).collect();
            let label = match classes {
                // log-likelihood loss expects labels in {-1, 1}
                Some((_, pos)) => {
                    if y[i] == pos {
                        1.0
                    } else {
                        -1.0
                    }
                }
                None => y[i] as f32,
            };
            train_x.push(Data::new_training_data(train_row, weights[i] as f32, label, None));
        }

        gbdt.fit(&mut train_x);

        self.fitted = Some(Fitted::Trees { model: gbdt, classes });
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match &self.fitted {
            None => Err(SelectionError::Estimator("GBDT model is not fitted".to_string())),
            Some(Fitted::Constant(c)) => Ok(Array1::from_elem(x.nrows(), *c)),
            Some(Fitted::Trees { model, classes }) => {
                let predictions = model.predict(&Self::to_data_vec(x));
                let out = match classes {
                    Some((neg, pos)) => predictions
                        .iter()
                        .map(|&p| if p >= 0.5 { *pos } else { *neg })
                        .collect(),
                    None => predictions.iter().map(|&p| p as f64).collect(),
                };
                Ok(out)
            }
        }
    }

    fn kind(&self) -> EstimatorKind {
        self.kind
    }

    fn boxed_clone(&self) -> Box<dyn Estimator> {
        Box::new(GbdtEstimator {
            params: self.params.clone(),
            kind: self.kind,
            fitted: None,
        })
    }

    fn name(&self) -> &str {
        match self.kind {
            EstimatorKind::Classifier => "gbdt_classifier",
            _ => "gbdt_regressor",
        }
    }
}

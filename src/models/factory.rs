use crate::config::ModelType;
use crate::models::estimator::Estimator;
use crate::models::gbdt::{GbdtEstimator, GbdtParams};
use crate::models::linear::LinearRegression;
use crate::models::logistic::LogisticRegression;

/// Build an unfitted estimator template from a `ModelType`.
pub fn build_estimator(model_type: &ModelType) -> Box<dyn Estimator> {
    match model_type {
        ModelType::LinearRegression { alpha, fit_intercept } => {
            Box::new(LinearRegression::new(*alpha, *fit_intercept))
        }
        ModelType::LogisticRegression {
            learning_rate,
            max_iter,
            l2,
        } => Box::new(LogisticRegression::new(*learning_rate, *max_iter, *l2)),
        ModelType::GbdtClassifier {
            learning_rate,
            max_depth,
            num_boost_round,
            training_optimization_level,
        } => Box::new(GbdtEstimator::classifier(GbdtParams {
            learning_rate: *learning_rate,
            max_depth: *max_depth,
            num_boost_round: *num_boost_round,
            training_optimization_level: *training_optimization_level,
        })),
        ModelType::GbdtRegressor {
            learning_rate,
            max_depth,
            num_boost_round,
            training_optimization_level,
        } => Box::new(GbdtEstimator::regressor(GbdtParams {
            learning_rate: *learning_rate,
            max_depth: *max_depth,
            num_boost_round: *num_boost_round,
            training_optimization_level: *training_optimization_level,
        })),
    }
}

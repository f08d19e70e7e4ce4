use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::columns::{CategoricalFeatures, ColumnInfo};
use crate::cross_validation::CvPlan;
use crate::data_handling::{Dataset, FeatureId};
use crate::error::{Result, SelectionError};
use crate::feature_selection::min_max::MinMaxCandidates;
use crate::feature_selection::selector::FeatureSelector;
use crate::feature_selection::stepwise::{Direction, StepCandidates};
use crate::feature_selection::strategy::{FeatureSpace, SearchStrategy};
use crate::models::factory::build_estimator;

/// Supported model types and their hyper-parameters.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    LinearRegression {
        alpha: f64,
        fit_intercept: bool,
    },
    LogisticRegression {
        learning_rate: f64,
        max_iter: usize,
        l2: f64,
    },
    GbdtClassifier {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        training_optimization_level: u8,
    },
    GbdtRegressor {
        learning_rate: f32,
        max_depth: u32,
        num_boost_round: u32,
        training_optimization_level: u8,
    },
}

impl Default for ModelType {
    fn default() -> Self {
        ModelType::LinearRegression {
            alpha: 0.0,
            fit_intercept: true,
        }
    }
}

impl FromStr for ModelType {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "linear" | "linear_regression" => Ok(ModelType::default()),
            "logistic" | "logistic_regression" => Ok(ModelType::LogisticRegression {
                learning_rate: 0.5,
                max_iter: 500,
                l2: 1e-4,
            }),
            "gbdt_classifier" => Ok(ModelType::GbdtClassifier {
                learning_rate: 0.1,
                max_depth: 6,
                num_boost_round: 50,
                training_optimization_level: 2,
            }),
            "gbdt_regressor" => Ok(ModelType::GbdtRegressor {
                learning_rate: 0.1,
                max_depth: 6,
                num_boost_round: 50,
                training_optimization_level: 2,
            }),
            _ => Err(SelectionError::InvalidConfig(format!(
                "Unknown model type: {}. Expected one of linear, logistic, gbdt_classifier, gbdt_regressor",
                s
            ))),
        }
    }
}

/// Estimator section of a search configuration.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct EstimatorConfig {
    pub model_type: ModelType,
}

/// How many batch candidates are handed to the workers at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PreDispatch {
    /// The whole batch in one dispatch.
    All,
    /// A multiple of the worker count (`"2*n_jobs"`).
    PerJob(usize),
    /// A fixed number of candidates.
    Count(usize),
}

impl Default for PreDispatch {
    fn default() -> Self {
        PreDispatch::PerJob(2)
    }
}

impl PreDispatch {
    /// Chunk size for `n_jobs` workers; `None` means the whole batch.
    pub fn chunk_size(&self, n_jobs: usize) -> Option<usize> {
        match self {
            PreDispatch::All => None,
            PreDispatch::PerJob(k) => Some((k * n_jobs).max(1)),
            PreDispatch::Count(n) => Some((*n).max(1)),
        }
    }
}

impl FromStr for PreDispatch {
    type Err = SelectionError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        let invalid = || {
            SelectionError::InvalidConfig(format!(
                "pre_dispatch must be 'all', an integer or an expression like '2*n_jobs', got '{}'",
                s
            ))
        };
        if s == "all" {
            return Ok(PreDispatch::All);
        }
        if s == "n_jobs" {
            return Ok(PreDispatch::PerJob(1));
        }
        if let Some(factor) = s.strip_suffix("n_jobs") {
            let factor = factor.trim().trim_end_matches('*').trim();
            return match factor.parse::<usize>() {
                Ok(k) if k > 0 => Ok(PreDispatch::PerJob(k)),
                _ => Err(invalid()),
            };
        }
        match s.parse::<usize>() {
            Ok(n) if n > 0 => Ok(PreDispatch::Count(n)),
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for PreDispatch {
    type Error = SelectionError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for PreDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreDispatch::All => write!(f, "all"),
            PreDispatch::PerJob(k) => write!(f, "{}*n_jobs", k),
            PreDispatch::Count(n) => write!(f, "{}", n),
        }
    }
}

impl From<PreDispatch> for String {
    fn from(p: PreDispatch) -> String {
        p.to_string()
    }
}

/// Driver settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SelectorConfig {
    /// 0 silent, 1 per-round summary, 2 per-round scores with timestamps.
    pub verbose: u8,
    /// Scorer identifier; `None` picks one from the estimator kind.
    pub scoring: Option<String>,
    pub cv: CvPlan,
    /// Worker threads; negative values count back from the available CPUs.
    pub n_jobs: i32,
    pub pre_dispatch: PreDispatch,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            verbose: 0,
            scoring: None,
            cv: CvPlan::default(),
            n_jobs: 1,
            pre_dispatch: PreDispatch::default(),
        }
    }
}

impl SelectorConfig {
    /// Number of worker threads (`-1` = every available CPU).
    pub fn resolve_n_jobs(&self) -> Result<usize> {
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1) as i64;
        let n_jobs = match self.n_jobs {
            0 => {
                return Err(SelectionError::InvalidConfig(
                    "n_jobs == 0 has no meaning".to_string(),
                ))
            }
            n if n > 0 => i64::from(n),
            n => available + 1 + i64::from(n),
        };
        if n_jobs < 1 {
            return Err(SelectionError::InvalidConfig(format!(
                "n_jobs = {} leaves no worker on {} CPUs",
                self.n_jobs, available
            )));
        }
        Ok(n_jobs as usize)
    }
}

/// Candidate generation strategy with its bounds.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    Exhaustive {
        min_features: usize,
        max_features: usize,
    },
    Stepwise {
        #[serde(default)]
        direction: Direction,
        #[serde(default)]
        min_features: usize,
        max_features: usize,
        #[serde(default)]
        initial_features: Option<Vec<FeatureId>>,
        #[serde(default)]
        random_state: u64,
    },
}

/// A complete search as loaded by the CLI.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct SearchConfig {
    #[serde(default)]
    pub estimator: EstimatorConfig,
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub fixed_features: Vec<FeatureId>,
    #[serde(default)]
    pub categorical_features: CategoricalFeatures,
    #[serde(default)]
    pub custom_feature_names: Option<Vec<String>>,
    #[serde(default)]
    pub selector: SelectorConfig,
}

impl SearchConfig {
    /// Build the configured strategy over the columns of `data`.
    pub fn build_strategy(&self, data: &Dataset) -> Result<Box<dyn SearchStrategy>> {
        let info = ColumnInfo::from_dataset(
            data,
            &self.categorical_features,
            self.custom_feature_names.as_deref(),
        )?;
        match &self.strategy {
            StrategyConfig::Exhaustive {
                min_features,
                max_features,
            } => {
                let space = FeatureSpace::new(info, *min_features, *max_features, &self.fixed_features)?;
                Ok(Box::new(MinMaxCandidates::new(space)?))
            }
            StrategyConfig::Stepwise {
                direction,
                min_features,
                max_features,
                initial_features,
                random_state,
            } => {
                let space = FeatureSpace::new(info, *min_features, *max_features, &self.fixed_features)?;
                let mut step = StepCandidates::new(space, *direction)?.with_random_state(*random_state)?;
                if let Some(features) = initial_features {
                    step = step.with_initial_features(features)?;
                }
                Ok(Box::new(step))
            }
        }
    }

    /// Estimator, strategy and driver settings wired together.
    pub fn build_selector(&self, data: &Dataset) -> Result<FeatureSelector> {
        let estimator = build_estimator(&self.estimator.model_type);
        let strategy = self.build_strategy(data)?;
        FeatureSelector::new(estimator, strategy, &self.selector)
    }
}

/// Read a `SearchConfig` from a JSON file.
pub fn load_search_config<P: AsRef<Path>>(path: P) -> AnyResult<SearchConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: SearchConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

//! Training hyperparameters.

use thiserror::Error;

use crate::data::DEFAULT_MAX_BINS;

/// How tree growth selects the next node to expand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Expand all nodes level by level up to `max_depth`.
    DepthWise { max_depth: u32 },
    /// Expand the frontier node with the highest gain until `max_leaves`
    /// leaves exist.
    LeafWise { max_leaves: u32 },
}

impl GrowthStrategy {
    /// Upper bound on leaves a single tree can have under this strategy.
    pub fn max_leaves(&self) -> usize {
        match *self {
            Self::DepthWise { max_depth } => 1usize << max_depth.min(31),
            Self::LeafWise { max_leaves } => max_leaves as usize,
        }
    }
}

/// Hold-out validation settings for early stopping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EarlyStoppingParams {
    /// Stop after this many rounds without validation-loss improvement.
    pub rounds: u32,
    /// Fraction of rows held out for validation, in (0, 1).
    pub validation_fraction: f32,
}

impl Default for EarlyStoppingParams {
    fn default() -> Self {
        Self { rounds: 10, validation_fraction: 0.2 }
    }
}

/// Invalid hyperparameter combinations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamsError {
    #[error("n_rounds must be at least 1")]
    ZeroRounds,
    #[error("learning_rate must be finite and positive, got {0}")]
    InvalidLearningRate(f32),
    #[error("max_depth must be at least 1")]
    ZeroDepth,
    #[error("max_leaves must be at least 2")]
    TooFewLeaves,
    #[error("max_bins must be in 2..=255, got {0}")]
    InvalidMaxBins(usize),
    #[error("reg_lambda must be finite and non-negative, got {0}")]
    InvalidRegLambda(f32),
    #[error("min_gain must be finite and non-negative, got {0}")]
    InvalidMinGain(f32),
    #[error("min_child_weight must be finite and non-negative, got {0}")]
    InvalidMinChildWeight(f32),
    #[error("validation_fraction must be in (0, 1), got {0}")]
    InvalidValidationFraction(f32),
    #[error("dataset too small for a validation split of fraction {fraction}")]
    ValidationSplitEmpty { fraction: f32 },
}

/// Hyperparameters for the boosting run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainParams {
    /// Number of boosting rounds (trees).
    pub n_rounds: u32,
    /// Shrinkage applied to every leaf value.
    pub learning_rate: f32,
    /// Tree growth strategy and its size limit.
    pub growth: GrowthStrategy,
    /// Maximum histogram bins per feature.
    pub max_bins: usize,
    /// L2 regularization (lambda).
    pub reg_lambda: f32,
    /// Minimum gain (gamma) required to keep a split.
    pub min_gain: f32,
    /// Minimum hessian sum per child.
    pub min_child_weight: f32,
    /// Minimum samples per child.
    pub min_samples_leaf: u32,
    /// Early stopping on a held-out split. `None` disables it.
    pub early_stopping: Option<EarlyStoppingParams>,
    /// Seed for the validation-split shuffle.
    pub seed: u64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            learning_rate: 0.1,
            growth: GrowthStrategy::DepthWise { max_depth: 5 },
            max_bins: DEFAULT_MAX_BINS,
            reg_lambda: 1.0,
            min_gain: 0.0,
            min_child_weight: 1.0,
            min_samples_leaf: 20,
            early_stopping: None,
            seed: 42,
        }
    }
}

impl TrainParams {
    /// Reject parameter values the trainer cannot honor.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.n_rounds == 0 {
            return Err(ParamsError::ZeroRounds);
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(ParamsError::InvalidLearningRate(self.learning_rate));
        }
        match self.growth {
            GrowthStrategy::DepthWise { max_depth: 0 } => return Err(ParamsError::ZeroDepth),
            GrowthStrategy::LeafWise { max_leaves } if max_leaves < 2 => {
                return Err(ParamsError::TooFewLeaves)
            }
            _ => {}
        }
        if self.max_bins < 2 || self.max_bins > DEFAULT_MAX_BINS {
            return Err(ParamsError::InvalidMaxBins(self.max_bins));
        }
        if !self.reg_lambda.is_finite() || self.reg_lambda < 0.0 {
            return Err(ParamsError::InvalidRegLambda(self.reg_lambda));
        }
        if !self.min_gain.is_finite() || self.min_gain < 0.0 {
            return Err(ParamsError::InvalidMinGain(self.min_gain));
        }
        if !self.min_child_weight.is_finite() || self.min_child_weight < 0.0 {
            return Err(ParamsError::InvalidMinChildWeight(self.min_child_weight));
        }
        if let Some(es) = &self.early_stopping {
            if !es.validation_fraction.is_finite()
                || es.validation_fraction <= 0.0
                || es.validation_fraction >= 1.0
            {
                return Err(ParamsError::InvalidValidationFraction(es.validation_fraction));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(TrainParams::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_rounds() {
        let params = TrainParams { n_rounds: 0, ..Default::default() };
        assert_eq!(params.validate(), Err(ParamsError::ZeroRounds));
    }

    #[test]
    fn rejects_bad_learning_rate() {
        for lr in [0.0, -0.1, f32::NAN] {
            let params = TrainParams { learning_rate: lr, ..Default::default() };
            assert!(matches!(params.validate(), Err(ParamsError::InvalidLearningRate(_))));
        }
    }

    #[test]
    fn rejects_degenerate_growth() {
        let depth = TrainParams {
            growth: GrowthStrategy::DepthWise { max_depth: 0 },
            ..Default::default()
        };
        assert_eq!(depth.validate(), Err(ParamsError::ZeroDepth));

        let leaves = TrainParams {
            growth: GrowthStrategy::LeafWise { max_leaves: 1 },
            ..Default::default()
        };
        assert_eq!(leaves.validate(), Err(ParamsError::TooFewLeaves));
    }

    #[test]
    fn rejects_bad_validation_fraction() {
        for fraction in [0.0, 1.0, -0.5] {
            let params = TrainParams {
                early_stopping: Some(EarlyStoppingParams {
                    rounds: 5,
                    validation_fraction: fraction,
                }),
                ..Default::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ParamsError::InvalidValidationFraction(_))
            ));
        }
    }

    #[test]
    fn growth_leaf_bound() {
        assert_eq!(GrowthStrategy::DepthWise { max_depth: 5 }.max_leaves(), 32);
        assert_eq!(GrowthStrategy::LeafWise { max_leaves: 31 }.max_leaves(), 31);
    }
}

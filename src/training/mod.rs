//! Gradient boosting training.
//!
//! The boosting loop lives in [`trainer`]; each round grows one regression
//! tree over the binned dataset using second-order gradients of the
//! logistic loss. Tree growth is driven by [`grower`], which combines the
//! histogram builder, the split finder and the row partitioner.

pub mod gradients;
pub mod grower;
pub mod histogram;
pub mod objective;
pub mod params;
pub mod partition;
pub mod split;
pub mod trainer;

pub use params::{EarlyStoppingParams, GrowthStrategy, ParamsError, TrainParams};
pub use trainer::{train_forest, TrainOutput};

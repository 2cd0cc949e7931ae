//! creditboost: a gradient boosting engine for credit default risk.
//!
//! Trains and serves a histogram-based gradient-boosted decision tree
//! ensemble that predicts the probability of serious delinquency within
//! two years, from a fixed 10-feature applicant profile.
//!
//! # Key Types
//!
//! - [`CreditModel`] - High-level model with train/predict/save/load
//! - [`TrainParams`] - Training configuration
//! - [`FeatureVector`] - Named-field applicant input for inference
//! - [`Dataset`] - Training data handling
//!
//! # Training
//!
//! Build a [`Dataset`] from named feature columns and binary labels, then
//! call [`CreditModel::train`]. The fitted model is immutable; persist it
//! with [`CreditModel::save_to_path`] and reload with
//! [`CreditModel::load_from_path`].
//!
//! # Inference
//!
//! [`CreditModel::predict`] is a pure function of the model and the input
//! vector. It is safe to call concurrently from any number of threads.

pub mod data;
pub mod features;
pub mod model;
pub mod persist;
pub mod preprocess;
pub mod repr;
pub mod training;
pub mod utils;

// High-level model types
pub use model::{CreditModel, ModelMeta, PredictError, TrainError};

// Training configuration
pub use training::{EarlyStoppingParams, GrowthStrategy, TrainParams};

// Data types (for preparing training data)
pub use data::{Dataset, DatasetError, FeatureColumn};

// Inference input
pub use features::{FeatureVector, FEATURE_NAMES, N_FEATURES};

// Shared utilities
pub use utils::Parallelism;

//! Training data handling: named columns and histogram binning.

pub mod binned;
pub mod dataset;

pub use binned::{BinMapper, BinnedDataset, DEFAULT_MAX_BINS};
pub use dataset::{Dataset, DatasetError, FeatureColumn};

//! Median imputation for the columns that may carry missing values.
//!
//! `MonthlyIncome` and `NumberOfDependents` are the only columns allowed
//! to be absent in raw data. At fit time the median of each column's
//! non-missing values becomes the imputation constant; at inference time
//! `transform` never fails - any missing field takes the stored constant.

use crate::features::{FEATURE_NAMES, IMPUTABLE_FEATURES, N_FEATURES};
use crate::utils::finite_median;

/// Imputation fit errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ImputeError {
    /// Every value in an imputation-eligible column was missing, so the
    /// median is undefined. Rejected rather than defaulting to zero.
    #[error("column {name:?} has no non-missing values, median is undefined")]
    AllMissing { name: &'static str },
}

/// Fitted per-column median imputation constants.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianImputer {
    /// Feature indices this imputer covers, in canonical order.
    columns: Vec<usize>,
    /// Stored median for each covered column.
    medians: Vec<f32>,
}

impl MedianImputer {
    /// Fit medians over the imputation-eligible columns of a column-major
    /// feature matrix.
    ///
    /// Fails if any eligible column contains no finite value.
    pub fn fit(columns: &[Vec<f32>]) -> Result<Self, ImputeError> {
        debug_assert_eq!(columns.len(), N_FEATURES);

        let mut medians = Vec::with_capacity(IMPUTABLE_FEATURES.len());
        for &idx in &IMPUTABLE_FEATURES {
            let median = finite_median(&columns[idx])
                .ok_or(ImputeError::AllMissing { name: FEATURE_NAMES[idx] })?;
            medians.push(median);
        }

        Ok(Self { columns: IMPUTABLE_FEATURES.to_vec(), medians })
    }

    /// Reconstruct an imputer from persisted state.
    pub fn from_parts(columns: Vec<usize>, medians: Vec<f32>) -> Self {
        debug_assert_eq!(columns.len(), medians.len());
        Self { columns, medians }
    }

    /// Covered feature indices.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Stored medians, parallel to [`columns`](Self::columns).
    pub fn medians(&self) -> &[f32] {
        &self.medians
    }

    /// Stored median for a feature index, if the imputer covers it.
    pub fn median_for(&self, feature: usize) -> Option<f32> {
        self.columns
            .iter()
            .position(|&c| c == feature)
            .map(|i| self.medians[i])
    }

    /// Fill missing values in the covered columns, in place.
    ///
    /// Values in columns the imputer does not cover pass through untouched.
    pub fn transform_columns(&self, columns: &mut [Vec<f32>]) {
        for (&idx, &median) in self.columns.iter().zip(&self.medians) {
            for v in &mut columns[idx] {
                if !v.is_finite() {
                    *v = median;
                }
            }
        }
    }
}

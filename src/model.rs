//! Trained credit-default model.
//!
//! [`CreditModel`] bundles the fitted median imputer, the boosted forest
//! and artifact metadata. Training consumes a validated [`Dataset`] and
//! returns an immutable model; prediction takes one applicant's
//! [`FeatureVector`] and returns the probability of serious delinquency
//! within two years.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{Dataset, DatasetError};
use crate::features::{FeatureVector, FEATURE_NAMES, MONTHLY_INCOME_IDX, N_DEPENDENTS_IDX, N_FEATURES};
use crate::persist::{self, DeserializeError, SerializeError};
use crate::preprocess::{ImputeError, MedianImputer};
use crate::repr::Forest;
use crate::training::objective::sigmoid;
use crate::training::{train_forest, ParamsError, TrainParams};
use crate::utils::Parallelism;

/// Errors from [`CreditModel::train`].
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Impute(#[from] ImputeError),

    #[error(transparent)]
    Params(#[from] ParamsError),

    /// A non-imputable column still holds a NaN or infinite value.
    #[error("non-finite value in column {column} at row {row}")]
    NonFiniteValue { column: &'static str, row: usize },
}

/// Errors from [`CreditModel::predict`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PredictError {
    /// A mandatory field holds a NaN or infinite value.
    #[error("field {field} is not finite")]
    NonFiniteField { field: &'static str },
}

/// Metadata carried alongside the trained forest in artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMeta {
    pub n_features: u32,
    /// Trees kept after any early-stopping rollback.
    pub n_trees: u32,
    pub learning_rate: f32,
    /// Best validation round, when early stopping ran.
    pub best_round: Option<u32>,
    /// Validation log-loss at the best round.
    pub validation_loss: Option<f64>,
}

/// A fitted credit-default predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditModel {
    imputer: MedianImputer,
    forest: Forest,
    meta: ModelMeta,
}

impl CreditModel {
    /// Train a model with automatic thread-pool parallelism.
    pub fn train(dataset: &Dataset, params: &TrainParams) -> Result<Self, TrainError> {
        Self::train_with_parallelism(dataset, params, Parallelism::default())
    }

    /// Train a model with an explicit parallelism setting.
    pub fn train_with_parallelism(
        dataset: &Dataset,
        params: &TrainParams,
        parallelism: Parallelism,
    ) -> Result<Self, TrainError> {
        let mut columns = dataset.columns().to_vec();
        let imputer = MedianImputer::fit(&columns)?;
        imputer.transform_columns(&mut columns);

        // Imputation only covers its own columns; anything else non-finite
        // is a data defect the caller must fix.
        for (idx, column) in columns.iter().enumerate() {
            if let Some(row) = column.iter().position(|v| !v.is_finite()) {
                return Err(TrainError::NonFiniteValue { column: FEATURE_NAMES[idx], row });
            }
        }

        let output = train_forest(&columns, dataset.labels(), params, parallelism)?;
        let meta = ModelMeta {
            n_features: N_FEATURES as u32,
            n_trees: output.forest.n_trees() as u32,
            learning_rate: params.learning_rate,
            best_round: output.best_round,
            validation_loss: output.validation_loss,
        };

        Ok(Self { imputer, forest: output.forest, meta })
    }

    /// Reassemble a model from its persisted parts.
    pub(crate) fn from_parts(imputer: MedianImputer, forest: Forest, meta: ModelMeta) -> Self {
        Self { imputer, forest, meta }
    }

    /// Probability of serious delinquency within two years, in `[0, 1]`.
    ///
    /// Missing optional fields take the training medians; mandatory
    /// fields must be finite.
    pub fn predict(&self, input: &FeatureVector) -> Result<f32, PredictError> {
        for (field, value) in input.mandatory_fields() {
            if !value.is_finite() {
                return Err(PredictError::NonFiniteField { field });
            }
        }

        let features = input.to_array(
            self.imputer.median_for(MONTHLY_INCOME_IDX).unwrap_or_default(),
            self.imputer.median_for(N_DEPENDENTS_IDX).unwrap_or_default(),
        );
        Ok(sigmoid(self.forest.predict_raw(&features)))
    }

    /// Score a batch of applicants.
    pub fn predict_batch(
        &self,
        inputs: &[FeatureVector],
        parallelism: Parallelism,
    ) -> Result<Vec<f32>, PredictError> {
        let income_median = self.imputer.median_for(MONTHLY_INCOME_IDX).unwrap_or_default();
        let dependents_median = self.imputer.median_for(N_DEPENDENTS_IDX).unwrap_or_default();

        let mut features = Vec::with_capacity(inputs.len() * N_FEATURES);
        for input in inputs {
            for (field, value) in input.mandatory_fields() {
                if !value.is_finite() {
                    return Err(PredictError::NonFiniteField { field });
                }
            }
            features.extend_from_slice(&input.to_array(income_median, dependents_median));
        }

        let mut raw = vec![0.0f32; inputs.len()];
        self.forest.predict_raw_into(&features, N_FEATURES, &mut raw, parallelism);
        Ok(raw.into_iter().map(sigmoid).collect())
    }

    /// The fitted imputer.
    pub fn imputer(&self) -> &MedianImputer {
        &self.imputer
    }

    /// The boosted ensemble.
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Artifact metadata.
    pub fn meta(&self) -> &ModelMeta {
        &self.meta
    }

    /// Write the model artifact to `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), SerializeError> {
        persist::write_model(self, writer)
    }

    /// Read a model artifact from `reader`.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, DeserializeError> {
        persist::read_model(reader)
    }

    /// Save the model artifact to a file.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<(), SerializeError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a model artifact from a file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, DeserializeError> {
        let file = File::open(path)?;
        Self::read_from(&mut BufReader::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureColumn;
    use crate::training::params::GrowthStrategy;

    /// Dataset where NumberOfTimes90DaysLate >= 1 implies default.
    fn labeled_dataset(n: usize) -> Dataset {
        let late: Vec<f32> = (0..n).map(|i| if i % 2 == 0 { 0.0 } else { 2.0 }).collect();
        let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();

        let features = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(idx, &name)| {
                let values = if name == "NumberOfTimes90DaysLate" {
                    late.clone()
                } else {
                    (0..n).map(|i| (i % 5) as f32 + idx as f32).collect()
                };
                FeatureColumn::new(name, values)
            })
            .collect();

        Dataset::new(features, labels).unwrap()
    }

    fn fast_params() -> TrainParams {
        TrainParams {
            n_rounds: 15,
            learning_rate: 0.3,
            growth: GrowthStrategy::DepthWise { max_depth: 2 },
            min_samples_leaf: 1,
            ..Default::default()
        }
    }

    fn applicant(late_90: f32) -> FeatureVector {
        FeatureVector {
            revolving_utilization: 0.5,
            age: 40.0,
            past_due_30_59: 0.0,
            debt_ratio: 0.3,
            monthly_income: Some(5000.0),
            open_credit_lines: 6.0,
            past_due_90_plus: late_90,
            real_estate_loans: 1.0,
            past_due_60_89: 0.0,
            n_dependents: Some(2.0),
        }
    }

    #[test]
    fn risky_and_safe_applicants_separate() {
        let model = CreditModel::train(&labeled_dataset(64), &fast_params()).unwrap();

        let safe = model.predict(&applicant(0.0)).unwrap();
        let risky = model.predict(&applicant(3.0)).unwrap();
        assert!(safe < 0.5, "safe applicant scored {safe}");
        assert!(risky > 0.5, "risky applicant scored {risky}");
        assert!((0.0..=1.0).contains(&safe));
        assert!((0.0..=1.0).contains(&risky));
    }

    #[test]
    fn missing_optionals_use_training_medians() {
        let model = CreditModel::train(&labeled_dataset(64), &fast_params()).unwrap();

        let mut input = applicant(0.0);
        input.monthly_income = None;
        input.n_dependents = None;
        let p = model.predict(&input).unwrap();
        assert!((0.0..=1.0).contains(&p));

        let mut imputed = applicant(0.0);
        imputed.monthly_income = model.imputer().median_for(MONTHLY_INCOME_IDX);
        imputed.n_dependents = model.imputer().median_for(N_DEPENDENTS_IDX);
        assert_eq!(p, model.predict(&imputed).unwrap());
    }

    #[test]
    fn non_finite_mandatory_field_is_rejected() {
        let model = CreditModel::train(&labeled_dataset(64), &fast_params()).unwrap();

        let mut input = applicant(0.0);
        input.debt_ratio = f32::NAN;
        assert_eq!(
            model.predict(&input),
            Err(PredictError::NonFiniteField { field: "DebtRatio" })
        );

        let mut input = applicant(0.0);
        input.age = f32::INFINITY;
        assert!(matches!(
            model.predict(&input),
            Err(PredictError::NonFiniteField { field: "age" })
        ));
    }

    #[test]
    fn nan_in_non_imputable_column_fails_training() {
        let n = 32;
        let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        let features = FEATURE_NAMES
            .iter()
            .map(|&name| {
                let mut values: Vec<f32> = (0..n).map(|i| i as f32).collect();
                if name == "age" {
                    values[7] = f32::NAN;
                }
                FeatureColumn::new(name, values)
            })
            .collect();
        let dataset = Dataset::new(features, labels).unwrap();

        assert!(matches!(
            CreditModel::train(&dataset, &fast_params()),
            Err(TrainError::NonFiniteValue { column: "age", row: 7 })
        ));
    }

    #[test]
    fn batch_matches_single_predictions() {
        let model = CreditModel::train(&labeled_dataset(64), &fast_params()).unwrap();
        let inputs = vec![applicant(0.0), applicant(1.0), applicant(5.0)];

        let batch = model.predict_batch(&inputs, Parallelism::Sequential).unwrap();
        for (input, &p) in inputs.iter().zip(&batch) {
            assert_eq!(p, model.predict(input).unwrap());
        }
    }
}

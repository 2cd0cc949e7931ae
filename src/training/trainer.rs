//! Boosting loop.
//!
//! Consumes imputed feature columns and binary labels, produces a
//! [`Forest`]. When early stopping is enabled a seeded shuffle carves out
//! a hold-out split; trees are grown on the remaining rows and the forest
//! is rolled back to the round with the best validation log-loss.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data::BinnedDataset;
use crate::repr::Forest;
use crate::training::gradients::GradientBuffer;
use crate::training::grower::TreeGrower;
use crate::training::objective::LogisticLoss;
use crate::training::params::{ParamsError, TrainParams};
use crate::utils::Parallelism;

/// Result of a boosting run.
#[derive(Debug, Clone)]
pub struct TrainOutput {
    pub forest: Forest,
    /// Rounds actually grown before stopping.
    pub rounds_trained: u32,
    /// Round of the best validation loss, when early stopping ran.
    pub best_round: Option<u32>,
    /// Validation log-loss at the best round.
    pub validation_loss: Option<f64>,
}

/// Monitors validation loss, lower is better.
struct EarlyStopping {
    patience: u32,
    best_value: Option<f64>,
    best_round: u32,
    current_round: u32,
}

impl EarlyStopping {
    fn new(patience: u32) -> Self {
        Self { patience, best_value: None, best_round: 0, current_round: 0 }
    }

    /// Record this round's loss; returns true when training should stop.
    fn should_stop(&mut self, value: f64) -> bool {
        let improved = self.best_value.map_or(true, |best| value < best);
        if improved {
            self.best_value = Some(value);
            self.best_round = self.current_round;
        }
        self.current_round += 1;
        self.current_round - self.best_round > self.patience
    }

    fn best_round(&self) -> u32 {
        self.best_round
    }

    fn best_value(&self) -> Option<f64> {
        self.best_value
    }
}

/// Hold-out rows gathered into row-major storage for per-round scoring.
struct ValidationSet {
    features: Vec<f32>,
    labels: Vec<f32>,
    raw_scores: Vec<f32>,
    n_features: usize,
}

impl ValidationSet {
    fn gather(columns: &[Vec<f32>], labels: &[f32], rows: &[u32], base_score: f32) -> Self {
        let n_features = columns.len();
        let mut features = Vec::with_capacity(rows.len() * n_features);
        let mut subset_labels = Vec::with_capacity(rows.len());
        for &row in rows {
            let r = row as usize;
            for column in columns {
                features.push(column[r]);
            }
            subset_labels.push(labels[r]);
        }
        Self {
            features,
            labels: subset_labels,
            raw_scores: vec![base_score; rows.len()],
            n_features,
        }
    }

    /// Add the newest tree's contribution to every validation row.
    fn accumulate(&mut self, tree: &crate::repr::Tree) {
        for (row, score) in self
            .features
            .chunks_exact(self.n_features)
            .zip(self.raw_scores.iter_mut())
        {
            *score += tree.predict_row(row);
        }
    }

    fn log_loss(&self) -> f64 {
        LogisticLoss::log_loss(&self.raw_scores, &self.labels)
    }
}

/// Gather a row subset of every column.
fn gather_columns(columns: &[Vec<f32>], rows: &[u32]) -> Vec<Vec<f32>> {
    columns
        .iter()
        .map(|column| rows.iter().map(|&r| column[r as usize]).collect())
        .collect()
}

fn gather_labels(labels: &[f32], rows: &[u32]) -> Vec<f32> {
    rows.iter().map(|&r| labels[r as usize]).collect()
}

/// Run gradient boosting over imputed feature columns.
///
/// `columns` must be in canonical feature order with all values finite;
/// `labels` are 0.0 or 1.0, one per row.
pub fn train_forest(
    columns: &[Vec<f32>],
    labels: &[f32],
    params: &TrainParams,
    parallelism: Parallelism,
) -> Result<TrainOutput, ParamsError> {
    params.validate()?;

    let n_rows = labels.len();

    // Carve out the hold-out split before binning so validation rows never
    // influence the cut points.
    let split = match &params.early_stopping {
        Some(es) => {
            let mut rows: Vec<u32> = (0..n_rows as u32).collect();
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(params.seed);
            rows.shuffle(&mut rng);

            if n_rows < 2 {
                return Err(ParamsError::ValidationSplitEmpty {
                    fraction: es.validation_fraction,
                });
            }
            let n_valid = ((n_rows as f64) * es.validation_fraction as f64).round() as usize;
            let n_valid = n_valid.clamp(1, n_rows - 1);
            let (valid_rows, train_rows) = rows.split_at(n_valid);
            Some((train_rows.to_vec(), valid_rows.to_vec(), es.rounds))
        }
        None => None,
    };

    let (train_columns, train_labels, mut validation, patience) = match &split {
        Some((train_rows, valid_rows, patience)) => {
            let train_columns = gather_columns(columns, train_rows);
            let train_labels = gather_labels(labels, train_rows);
            let base = LogisticLoss::base_score(&train_labels);
            let validation = ValidationSet::gather(columns, labels, valid_rows, base);
            (train_columns, train_labels, Some(validation), Some(*patience))
        }
        None => (columns.to_vec(), labels.to_vec(), None, None),
    };

    let binned = BinnedDataset::from_columns(&train_columns, params.max_bins);
    let base_score = LogisticLoss::base_score(&train_labels);
    let n_train = train_labels.len();

    let mut forest = Forest::new(base_score);
    let mut raw_scores = vec![base_score; n_train];
    let mut gradients = GradientBuffer::new(n_train);
    let mut grower = TreeGrower::new(&binned, params, parallelism);
    let mut stopper = patience.map(EarlyStopping::new);

    let mut rounds_trained = 0u32;
    for _round in 0..params.n_rounds {
        LogisticLoss::update_gradients(&raw_scores, &train_labels, &mut gradients, parallelism);
        let tree = grower.grow(
            gradients.grad(),
            gradients.hess(),
            params.learning_rate,
            &mut raw_scores,
        );

        if let Some(validation) = validation.as_mut() {
            validation.accumulate(&tree);
        }
        forest.push_tree(tree);
        rounds_trained += 1;

        if let (Some(stopper), Some(validation)) = (stopper.as_mut(), validation.as_ref()) {
            if stopper.should_stop(validation.log_loss()) {
                break;
            }
        }
    }

    let (best_round, validation_loss) = match &stopper {
        Some(stopper) => {
            // Keep only the trees up to the best round.
            forest.truncate(stopper.best_round() as usize + 1);
            (Some(stopper.best_round()), stopper.best_value())
        }
        None => (None, None),
    };

    Ok(TrainOutput { forest, rounds_trained, best_round, validation_loss })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::objective::sigmoid;
    use crate::training::params::{EarlyStoppingParams, GrowthStrategy};

    /// 0/1 labels perfectly separated by the first feature.
    fn separable_data(n: usize) -> (Vec<Vec<f32>>, Vec<f32>) {
        let feature: Vec<f32> = (0..n).map(|i| if i % 2 == 0 { 0.0 } else { 10.0 }).collect();
        let noise: Vec<f32> = (0..n).map(|i| (i % 7) as f32).collect();
        let labels: Vec<f32> = (0..n).map(|i| (i % 2) as f32).collect();
        (vec![feature, noise], labels)
    }

    fn fast_params() -> TrainParams {
        TrainParams {
            n_rounds: 20,
            learning_rate: 0.3,
            growth: GrowthStrategy::DepthWise { max_depth: 2 },
            min_samples_leaf: 1,
            ..Default::default()
        }
    }

    #[test]
    fn learns_separable_labels() {
        let (columns, labels) = separable_data(64);
        let output =
            train_forest(&columns, &labels, &fast_params(), Parallelism::Sequential).unwrap();

        assert_eq!(output.rounds_trained, 20);
        assert_eq!(output.forest.n_trees(), 20);

        let negative = sigmoid(output.forest.predict_raw(&[0.0, 3.0]));
        let positive = sigmoid(output.forest.predict_raw(&[10.0, 3.0]));
        assert!(negative < 0.1, "negative class scored {negative}");
        assert!(positive > 0.9, "positive class scored {positive}");
    }

    #[test]
    fn training_is_deterministic() {
        let (columns, labels) = separable_data(64);
        let a = train_forest(&columns, &labels, &fast_params(), Parallelism::Sequential).unwrap();
        let b = train_forest(&columns, &labels, &fast_params(), Parallelism::Parallel).unwrap();

        assert_eq!(a.forest, b.forest);
    }

    #[test]
    fn early_stopping_truncates_to_best_round() {
        let (columns, labels) = separable_data(200);
        let params = TrainParams {
            early_stopping: Some(EarlyStoppingParams { rounds: 3, validation_fraction: 0.25 }),
            ..fast_params()
        };
        let output = train_forest(&columns, &labels, &params, Parallelism::Sequential).unwrap();

        let best = output.best_round.expect("early stopping ran");
        assert_eq!(output.forest.n_trees(), best as usize + 1);
        assert!(output.forest.n_trees() <= output.rounds_trained as usize);
        assert!(output.validation_loss.expect("loss recorded") >= 0.0);
    }

    #[test]
    fn early_stopping_split_is_seeded() {
        let (columns, labels) = separable_data(100);
        let params = TrainParams {
            early_stopping: Some(EarlyStoppingParams { rounds: 5, validation_fraction: 0.2 }),
            ..fast_params()
        };
        let a = train_forest(&columns, &labels, &params, Parallelism::Sequential).unwrap();
        let b = train_forest(&columns, &labels, &params, Parallelism::Sequential).unwrap();
        assert_eq!(a.forest, b.forest);
        assert_eq!(a.best_round, b.best_round);
    }

    #[test]
    fn rejects_tiny_dataset_for_validation_split() {
        let columns = vec![vec![1.0]];
        let labels = vec![1.0];
        let params = TrainParams {
            early_stopping: Some(EarlyStoppingParams { rounds: 2, validation_fraction: 0.5 }),
            ..fast_params()
        };
        assert!(matches!(
            train_forest(&columns, &labels, &params, Parallelism::Sequential),
            Err(ParamsError::ValidationSplitEmpty { .. })
        ));
    }

    #[test]
    fn single_class_labels_stay_finite() {
        let columns = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let labels = vec![0.0; 4];
        let params = TrainParams { n_rounds: 5, min_samples_leaf: 1, ..Default::default() };
        let output = train_forest(&columns, &labels, &params, Parallelism::Sequential).unwrap();

        let p = sigmoid(output.forest.predict_raw(&[2.5]));
        assert!(p.is_finite());
        assert!(p < 0.01);
    }

    #[test]
    fn early_stopper_stops_after_patience() {
        let mut stopper = EarlyStopping::new(3);
        assert!(!stopper.should_stop(0.5));
        assert!(!stopper.should_stop(0.6));
        assert!(!stopper.should_stop(0.7));
        assert!(stopper.should_stop(0.8));
        assert_eq!(stopper.best_round(), 0);
    }

    #[test]
    fn early_stopper_resets_on_improvement() {
        let mut stopper = EarlyStopping::new(2);
        assert!(!stopper.should_stop(1.0));
        assert!(!stopper.should_stop(1.1));
        assert!(!stopper.should_stop(0.9));
        assert!(!stopper.should_stop(1.0));
        assert!(!stopper.should_stop(1.1));
        assert!(stopper.should_stop(1.2));
        assert_eq!(stopper.best_round(), 2);
    }
}

//! Logistic loss objective for binary classification.

use rayon::prelude::*;

use crate::training::gradients::GradientBuffer;
use crate::utils::Parallelism;

/// Floor for hessians so leaf weights stay bounded when predictions
/// saturate.
const HESSIAN_FLOOR: f32 = 1e-6;

/// Clamp for probabilities before taking log-odds or log-loss.
const PROB_EPS: f64 = 1e-7;

/// Numerically stable sigmoid.
#[inline]
pub fn sigmoid(x: f32) -> f32 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic loss with second-order gradients.
///
/// Raw scores are log-odds; `grad = sigmoid(raw) - label` and
/// `hess = p * (1 - p)` floored at [`HESSIAN_FLOOR`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticLoss;

impl LogisticLoss {
    /// Initial raw score: log-odds of the positive rate, clamped away
    /// from 0 and 1 so single-class labels stay finite.
    pub fn base_score(labels: &[f32]) -> f32 {
        let n = labels.len().max(1) as f64;
        let positives: f64 = labels.iter().map(|&y| y as f64).sum();
        let rate = (positives / n).clamp(PROB_EPS, 1.0 - PROB_EPS);
        (rate / (1.0 - rate)).ln() as f32
    }

    /// Fill `buffer` with gradients of the loss at `raw_scores`.
    pub fn update_gradients(
        raw_scores: &[f32],
        labels: &[f32],
        buffer: &mut GradientBuffer,
        parallelism: Parallelism,
    ) {
        debug_assert_eq!(raw_scores.len(), labels.len());
        debug_assert_eq!(raw_scores.len(), buffer.len());

        let (grad, hess) = buffer.as_mut_slices();
        let update = |(((g, h), &raw), &label): (((&mut f32, &mut f32), &f32), &f32)| {
            let p = sigmoid(raw);
            *g = p - label;
            *h = (p * (1.0 - p)).max(HESSIAN_FLOOR);
        };

        match parallelism {
            Parallelism::Parallel => {
                grad.par_iter_mut()
                    .zip(hess.par_iter_mut())
                    .zip(raw_scores.par_iter())
                    .zip(labels.par_iter())
                    .for_each(update);
            }
            Parallelism::Sequential => {
                grad.iter_mut()
                    .zip(hess.iter_mut())
                    .zip(raw_scores.iter())
                    .zip(labels.iter())
                    .for_each(update);
            }
        }
    }

    /// Mean log-loss of raw scores against labels. Early stopping metric.
    pub fn log_loss(raw_scores: &[f32], labels: &[f32]) -> f64 {
        debug_assert_eq!(raw_scores.len(), labels.len());
        if raw_scores.is_empty() {
            return 0.0;
        }
        let total: f64 = raw_scores
            .iter()
            .zip(labels)
            .map(|(&raw, &label)| {
                let p = (sigmoid(raw) as f64).clamp(PROB_EPS, 1.0 - PROB_EPS);
                if label > 0.5 {
                    -p.ln()
                } else {
                    -(1.0 - p).ln()
                }
            })
            .sum();
        total / raw_scores.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_symmetry() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        assert_relative_eq!(sigmoid(2.0) + sigmoid(-2.0), 1.0, epsilon = 1e-6);
        assert!(sigmoid(40.0) > 0.999_999);
        assert!(sigmoid(-40.0) < 1e-6);
    }

    #[test]
    fn base_score_matches_log_odds() {
        // 1 positive out of 4: log(0.25 / 0.75)
        let labels = [1.0, 0.0, 0.0, 0.0];
        assert_relative_eq!(
            LogisticLoss::base_score(&labels),
            (0.25f32 / 0.75).ln(),
            epsilon = 1e-6
        );
    }

    #[test]
    fn base_score_finite_for_single_class() {
        assert!(LogisticLoss::base_score(&[1.0, 1.0, 1.0]).is_finite());
        assert!(LogisticLoss::base_score(&[0.0, 0.0]).is_finite());
    }

    #[test]
    fn gradients_at_zero_score() {
        let raw = [0.0, 0.0];
        let labels = [1.0, 0.0];
        let mut buffer = GradientBuffer::new(2);
        LogisticLoss::update_gradients(&raw, &labels, &mut buffer, Parallelism::Sequential);

        assert_relative_eq!(buffer.grad()[0], -0.5);
        assert_relative_eq!(buffer.grad()[1], 0.5);
        assert_relative_eq!(buffer.hess()[0], 0.25);
        assert_relative_eq!(buffer.hess()[1], 0.25);
    }

    #[test]
    fn hessian_is_floored_at_saturation() {
        let raw = [100.0];
        let labels = [1.0];
        let mut buffer = GradientBuffer::new(1);
        LogisticLoss::update_gradients(&raw, &labels, &mut buffer, Parallelism::Sequential);
        assert_eq!(buffer.hess()[0], 1e-6);
    }

    #[test]
    fn parallel_matches_sequential() {
        let raw: Vec<f32> = (0..64).map(|i| (i as f32 - 32.0) * 0.1).collect();
        let labels: Vec<f32> = (0..64).map(|i| (i % 2) as f32).collect();

        let mut seq = GradientBuffer::new(64);
        let mut par = GradientBuffer::new(64);
        LogisticLoss::update_gradients(&raw, &labels, &mut seq, Parallelism::Sequential);
        LogisticLoss::update_gradients(&raw, &labels, &mut par, Parallelism::Parallel);

        assert_eq!(seq.grad(), par.grad());
        assert_eq!(seq.hess(), par.hess());
    }

    #[test]
    fn log_loss_prefers_correct_predictions() {
        let labels = [1.0, 0.0];
        let good = LogisticLoss::log_loss(&[3.0, -3.0], &labels);
        let bad = LogisticLoss::log_loss(&[-3.0, 3.0], &labels);
        assert!(good < bad);
    }
}

//! Split gain evaluation and best-split search.

use crate::data::BinnedDataset;
use crate::training::histogram::{feature_totals, HistogramBin};
use crate::training::params::TrainParams;

/// Regularization and constraint parameters for split scoring.
#[derive(Debug, Clone)]
pub struct GainParams {
    /// L2 regularization (lambda).
    pub reg_lambda: f32,
    /// Minimum gain (gamma) subtracted from every candidate.
    pub min_gain: f32,
    /// Minimum hessian sum per child.
    pub min_child_weight: f32,
    /// Minimum samples per child.
    pub min_samples_leaf: u32,
}

impl Default for GainParams {
    fn default() -> Self {
        Self { reg_lambda: 1.0, min_gain: 0.0, min_child_weight: 1.0, min_samples_leaf: 1 }
    }
}

impl From<&TrainParams> for GainParams {
    fn from(params: &TrainParams) -> Self {
        Self {
            reg_lambda: params.reg_lambda,
            min_gain: params.min_gain,
            min_child_weight: params.min_child_weight,
            min_samples_leaf: params.min_samples_leaf,
        }
    }
}

impl GainParams {
    /// Split gain:
    ///
    /// ```text
    /// gain = 0.5 * [G_L²/(H_L + λ) + G_R²/(H_R + λ) - G_P²/(H_P + λ)] - γ
    /// ```
    #[inline]
    pub fn compute_gain(&self, left: &HistogramBin, right: &HistogramBin, parent: &HistogramBin) -> f32 {
        let lambda = self.reg_lambda as f64;

        let score_left = left.grad * left.grad / (left.hess + lambda);
        let score_right = right.grad * right.grad / (right.hess + lambda);
        let score_parent = parent.grad * parent.grad / (parent.hess + lambda);

        (0.5 * (score_left + score_right - score_parent) - self.min_gain as f64) as f32
    }

    /// Check child-size constraints.
    #[inline]
    pub fn is_valid_split(&self, left: &HistogramBin, right: &HistogramBin) -> bool {
        let min_weight = self.min_child_weight as f64;
        left.hess >= min_weight
            && right.hess >= min_weight
            && left.count >= self.min_samples_leaf
            && right.count >= self.min_samples_leaf
    }

    /// Newton leaf weight: `-G / (H + λ)`.
    #[inline]
    pub fn leaf_weight(&self, stats: &HistogramBin) -> f32 {
        (-stats.grad / (stats.hess + self.reg_lambda as f64)) as f32
    }
}

/// The winning split for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    /// Feature to split on.
    pub feature: u32,
    /// Bin threshold: rows with `bin <= this` go left.
    pub bin: u8,
    /// Gain of the split, gamma already subtracted.
    pub gain: f32,
    /// Accumulated statistics of the left child.
    pub left: HistogramBin,
    /// Accumulated statistics of the right child.
    pub right: HistogramBin,
}

/// Scan a node histogram for the best split.
///
/// Returns `None` when no candidate has positive gain under the
/// constraints. Features and bins are scanned in ascending order and a
/// candidate replaces the incumbent only on strictly higher gain, so ties
/// resolve to the lowest feature index, then the lowest bin.
pub fn find_best_split(
    histogram: &[HistogramBin],
    binned: &BinnedDataset,
    parent: &HistogramBin,
    gain_params: &GainParams,
) -> Option<SplitInfo> {
    let mut best: Option<SplitInfo> = None;
    let mut offset = 0usize;

    for feature in 0..binned.n_features() {
        let n_bins = binned.n_bins(feature);
        let bins = &histogram[offset..offset + n_bins];
        offset += n_bins;

        // The last bin has no right side; skip constant features.
        if n_bins < 2 {
            continue;
        }

        let mut left = HistogramBin::default();
        for (bin, stats) in bins[..n_bins - 1].iter().enumerate() {
            left.grad += stats.grad;
            left.hess += stats.hess;
            left.count += stats.count;

            let right = HistogramBin {
                grad: parent.grad - left.grad,
                hess: parent.hess - left.hess,
                count: parent.count - left.count,
            };

            if !gain_params.is_valid_split(&left, &right) {
                continue;
            }
            let gain = gain_params.compute_gain(&left, &right, parent);
            if gain <= 0.0 {
                continue;
            }
            if best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitInfo {
                    feature: feature as u32,
                    bin: bin as u8,
                    gain,
                    left,
                    right,
                });
            }
        }
    }

    best
}

/// Node totals derived from the first feature's bin range.
pub fn node_totals(histogram: &[HistogramBin], binned: &BinnedDataset) -> HistogramBin {
    feature_totals(&histogram[..binned.n_bins(0)])
}

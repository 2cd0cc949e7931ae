//! Gradient histograms over binned features.
//!
//! One histogram covers every feature of one tree node: a flat buffer of
//! [`HistogramBin`] with per-feature regions laid out in feature order.
//! Bins accumulate in `f64` because the subtraction trick takes small
//! differences of large sums.

use rayon::prelude::*;

use crate::data::BinnedDataset;
use crate::utils::Parallelism;

/// Minimum rows in a node before feature-parallel building pays off.
const MIN_ROWS_PARALLEL: usize = 1024;

/// Accumulated gradient statistics for one bin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HistogramBin {
    pub grad: f64,
    pub hess: f64,
    pub count: u32,
}

/// Allocate a zeroed histogram covering all features of `binned`.
pub fn new_histogram(binned: &BinnedDataset) -> Vec<HistogramBin> {
    vec![HistogramBin::default(); binned.total_bins()]
}

/// Split a node histogram into per-feature mutable regions.
fn per_feature_slices<'a>(
    histogram: &'a mut [HistogramBin],
    binned: &BinnedDataset,
) -> Vec<&'a mut [HistogramBin]> {
    let mut slices = Vec::with_capacity(binned.n_features());
    let mut rest = histogram;
    for feature in 0..binned.n_features() {
        let (head, tail) = rest.split_at_mut(binned.n_bins(feature));
        slices.push(head);
        rest = tail;
    }
    slices
}

/// Accumulate gradients of `rows` into a zeroed `histogram`.
pub fn build_histogram(
    histogram: &mut [HistogramBin],
    binned: &BinnedDataset,
    grad: &[f32],
    hess: &[f32],
    rows: &[u32],
    parallelism: Parallelism,
) {
    debug_assert_eq!(histogram.len(), binned.total_bins());

    let slices = per_feature_slices(histogram, binned);
    if parallelism.is_parallel() && rows.len() >= MIN_ROWS_PARALLEL {
        slices.into_par_iter().enumerate().for_each(|(feature, slice)| {
            build_feature(slice, binned.feature_codes(feature), grad, hess, rows);
        });
    } else {
        for (feature, slice) in slices.into_iter().enumerate() {
            build_feature(slice, binned.feature_codes(feature), grad, hess, rows);
        }
    }
}

/// Accumulate one feature's bins over the node's rows.
#[inline]
fn build_feature(out: &mut [HistogramBin], codes: &[u8], grad: &[f32], hess: &[f32], rows: &[u32]) {
    for &row in rows {
        let r = row as usize;
        let bin = codes[r] as usize;
        let slot = &mut out[bin];
        slot.grad += grad[r] as f64;
        slot.hess += hess[r] as f64;
        slot.count += 1;
    }
}

/// Subtraction trick: turn a parent histogram into the sibling of `child`
/// in place.
pub fn subtract_histogram(parent: &mut [HistogramBin], child: &[HistogramBin]) {
    debug_assert_eq!(parent.len(), child.len());
    for (p, c) in parent.iter_mut().zip(child) {
        p.grad -= c.grad;
        p.hess -= c.hess;
        p.count -= c.count;
    }
}

/// Sum gradient statistics over one feature's bin range.
///
/// Every feature region of a node histogram covers the same rows, so the
/// totals of any single feature are the node totals.
pub fn feature_totals(bins: &[HistogramBin]) -> HistogramBin {
    let mut total = HistogramBin::default();
    for bin in bins {
        total.grad += bin.grad;
        total.hess += bin.hess;
        total.count += bin.count;
    }
    total
}

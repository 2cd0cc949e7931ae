//! Histogram binning: discretizing features into a bounded number of bins.
//!
//! Bin boundaries are computed once, globally, over the full (imputed)
//! training set using equal-frequency cuts, so split search runs in
//! O(bins) per feature instead of O(rows). Bins are closed-open `[lo, hi)`
//! intervals; values outside the observed range clamp to the edge bins.
//!
//! Trees translate bin thresholds back to raw cut values when a split is
//! applied, so the cuts never need to be persisted with the model.

/// Default maximum number of bins per feature.
pub const DEFAULT_MAX_BINS: usize = 255;

/// Bin boundaries for a single feature.
///
/// Stores the interior cut points `c_0 < c_1 < ... < c_{k-2}` for `k` bins.
/// A value `v` maps to bin `b` such that `c_{b-1} <= v < c_b`; values below
/// `c_0` map to bin 0 and values at or above `c_{k-2}` map to bin `k-1`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    cuts: Vec<f32>,
}

impl BinMapper {
    /// Build a mapper from equal-frequency cuts over the given values.
    ///
    /// Candidate cut positions are the `max_bins`-quantiles of the sorted
    /// values; a cut is emitted only where adjacent quantile values differ,
    /// placed at their midpoint. A constant feature yields no cuts (a
    /// single bin), which makes it unsplittable.
    ///
    /// All values must be finite (imputation runs before binning).
    pub fn fit(values: &[f32], max_bins: usize) -> Self {
        debug_assert!(max_bins >= 2);
        debug_assert!(values.iter().all(|v| v.is_finite()));

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let n = sorted.len();
        let mut cuts = Vec::new();
        for i in 1..max_bins {
            let rank = (i * n) / max_bins;
            if rank == 0 || rank >= n {
                continue;
            }
            let lo = sorted[rank - 1];
            let hi = sorted[rank];
            if hi > lo {
                let mid = lo + (hi - lo) / 2.0;
                // Midpoint can round to `lo` for adjacent floats; the cut
                // must stay strictly above the lower value.
                let cut = if mid > lo { mid } else { hi };
                if cuts.last().map_or(true, |&last| cut > last) {
                    cuts.push(cut);
                }
            }
        }

        Self { cuts }
    }

    /// Create a mapper directly from interior cut points.
    ///
    /// Cuts must be strictly increasing.
    pub fn from_cuts(cuts: Vec<f32>) -> Self {
        debug_assert!(cuts.windows(2).all(|w| w[0] < w[1]));
        Self { cuts }
    }

    /// Number of bins (`cuts + 1`).
    #[inline]
    pub fn n_bins(&self) -> usize {
        self.cuts.len() + 1
    }

    /// Interior cut points.
    #[inline]
    pub fn cuts(&self) -> &[f32] {
        &self.cuts
    }

    /// Map a raw value to its bin index.
    ///
    /// Closed-open intervals: a value equal to a cut belongs to the bin
    /// whose lower edge it is. Out-of-range values clamp to the edge bins.
    #[inline]
    pub fn bin_for_value(&self, value: f32) -> u8 {
        self.cuts.partition_point(|&c| c <= value) as u8
    }

    /// Raw threshold separating bins `0..=bin` from `bin+1..`.
    ///
    /// A training split "bin index <= `bin` goes left" is equivalent to the
    /// inference rule "value < threshold goes left" with this threshold.
    /// `bin` must be less than `n_bins() - 1`.
    #[inline]
    pub fn threshold_for_bin(&self, bin: u8) -> f32 {
        self.cuts[bin as usize]
    }
}

/// A fully binned training matrix.
///
/// Column-major storage: one contiguous `Vec<u8>` of bin codes per feature,
/// plus the per-feature [`BinMapper`]s.
#[derive(Debug, Clone)]
pub struct BinnedDataset {
    codes: Vec<Vec<u8>>,
    mappers: Vec<BinMapper>,
    n_rows: usize,
}

impl BinnedDataset {
    /// Bin a column-major feature matrix.
    ///
    /// Fits one [`BinMapper`] per feature over all rows, then encodes every
    /// value. Deterministic for identical input.
    pub fn from_columns(columns: &[Vec<f32>], max_bins: usize) -> Self {
        let n_rows = columns.first().map_or(0, |c| c.len());

        let mappers: Vec<BinMapper> = columns
            .iter()
            .map(|col| BinMapper::fit(col, max_bins))
            .collect();

        let codes: Vec<Vec<u8>> = columns
            .iter()
            .zip(&mappers)
            .map(|(col, mapper)| col.iter().map(|&v| mapper.bin_for_value(v)).collect())
            .collect();

        Self { codes, mappers, n_rows }
    }

    /// Number of rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.codes.len()
    }

    /// Bin codes for one feature (length = `n_rows`).
    #[inline]
    pub fn feature_codes(&self, feature: usize) -> &[u8] {
        &self.codes[feature]
    }

    /// Bin code for a single cell.
    #[inline]
    pub fn bin(&self, row: usize, feature: usize) -> u8 {
        self.codes[feature][row]
    }

    /// Bin mapper for one feature.
    #[inline]
    pub fn mapper(&self, feature: usize) -> &BinMapper {
        &self.mappers[feature]
    }

    /// Number of bins for one feature.
    #[inline]
    pub fn n_bins(&self, feature: usize) -> usize {
        self.mappers[feature].n_bins()
    }

    /// Total bins across all features (histogram buffer size).
    pub fn total_bins(&self) -> usize {
        self.mappers.iter().map(|m| m.n_bins()).sum()
    }
}

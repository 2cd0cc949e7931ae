//! Common utilities used across the crate.

/// Median of the finite values in a slice.
///
/// Non-finite entries (NaN, ±∞) are skipped. Returns `None` when the slice
/// contains no finite value. For an even count the two middle values are
/// averaged.
pub fn finite_median(values: &[f32]) -> Option<f32> {
    let mut finite: Vec<f32> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = finite.len();
    if n % 2 == 1 {
        Some(finite[n / 2])
    } else {
        Some((finite[n / 2 - 1] + finite[n / 2]) / 2.0)
    }
}

// =============================================================================
// Parallelism Configuration
// =============================================================================

/// Whether parallel execution is allowed.
///
/// This is a simple boolean flag passed through training and inference
/// components. When `Parallel`, components may use `rayon` parallel
/// iterators; when `Sequential`, they must iterate serially. Components do
/// not manage thread pools - they just respect this flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Parallelism {
    Sequential,
    Parallel,
}

impl Parallelism {
    /// Create from thread count semantics.
    ///
    /// - 0 = auto (parallel if the rayon pool has multiple threads)
    /// - 1 = sequential
    /// - >1 = parallel
    #[inline]
    pub fn from_threads(n_threads: usize) -> Self {
        if n_threads == 1 || (n_threads == 0 && rayon::current_num_threads() == 1) {
            Parallelism::Sequential
        } else {
            Parallelism::Parallel
        }
    }

    /// Returns `true` if parallel execution is allowed.
    #[inline]
    pub fn is_parallel(self) -> bool {
        matches!(self, Parallelism::Parallel)
    }
}

impl Default for Parallelism {
    fn default() -> Self {
        Parallelism::Parallel
    }
}

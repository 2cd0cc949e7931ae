//! Row partitioning during tree growth.
//!
//! A single contiguous index buffer holds every training row, ordered by
//! leaf. Each leaf owns a `[begin, begin + count)` range; applying a split
//! partitions the range in place, so growing a tree never allocates per
//! node.

use crate::data::BinnedDataset;
use crate::training::split::SplitInfo;

/// Leaf identifier local to the partitioner, in allocation order.
pub type LeafId = u32;

/// Tracks which rows belong to which leaf while one tree grows.
///
/// ```text
/// initial:            indices [0 1 2 3 4 5 6 7]   leaf 0 owns all
/// split leaf 0:       indices [0 2 4 6 | 1 3 5 7] leaf 0 left, leaf 1 right
/// ```
pub struct RowPartitioner {
    indices: Vec<u32>,
    leaf_begin: Vec<u32>,
    leaf_count: Vec<u32>,
    n_leaves: usize,
}

impl RowPartitioner {
    /// Create a partitioner for `n_rows` rows and up to `max_leaves`
    /// leaves per tree.
    pub fn new(n_rows: usize, max_leaves: usize) -> Self {
        let mut partitioner = Self {
            indices: (0..n_rows as u32).collect(),
            leaf_begin: vec![0; max_leaves.max(1)],
            leaf_count: vec![0; max_leaves.max(1)],
            n_leaves: 0,
        };
        partitioner.reset();
        partitioner
    }

    /// Put every row back into the root leaf for a new tree.
    pub fn reset(&mut self) {
        for (i, idx) in self.indices.iter_mut().enumerate() {
            *idx = i as u32;
        }
        self.leaf_begin.fill(0);
        self.leaf_count.fill(0);
        self.leaf_count[0] = self.indices.len() as u32;
        self.n_leaves = 1;
    }

    /// Rows currently assigned to `leaf`.
    #[inline]
    pub fn leaf_rows(&self, leaf: LeafId) -> &[u32] {
        let begin = self.leaf_begin[leaf as usize] as usize;
        let count = self.leaf_count[leaf as usize] as usize;
        &self.indices[begin..begin + count]
    }

    /// Number of rows in `leaf`.
    #[inline]
    pub fn leaf_count(&self, leaf: LeafId) -> u32 {
        self.leaf_count[leaf as usize]
    }

    /// Number of leaves allocated for the current tree.
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    /// Partition `leaf` in place by `split`. The original leaf keeps the
    /// left rows; the returned leaf holds the right rows.
    pub fn split(
        &mut self,
        leaf: LeafId,
        split: &SplitInfo,
        binned: &BinnedDataset,
    ) -> (LeafId, u32, u32) {
        let begin = self.leaf_begin[leaf as usize] as usize;
        let count = self.leaf_count[leaf as usize] as usize;
        let end = begin + count;

        let codes = binned.feature_codes(split.feature as usize);
        let mut left_end = begin;
        for i in begin..end {
            let row = self.indices[i] as usize;
            if codes[row] <= split.bin {
                self.indices.swap(i, left_end);
                left_end += 1;
            }
        }

        let left_count = (left_end - begin) as u32;
        let right_count = (end - left_end) as u32;

        self.leaf_count[leaf as usize] = left_count;

        let right_leaf = self.n_leaves as LeafId;
        self.n_leaves += 1;
        self.leaf_begin[right_leaf as usize] = left_end as u32;
        self.leaf_count[right_leaf as usize] = right_count;

        (right_leaf, left_count, right_count)
    }
}

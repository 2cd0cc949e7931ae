//! Single-tree growth over a binned dataset.
//!
//! The grower runs the histogram / best-split / partition cycle for one
//! boosting round. Child histograms use the subtraction trick: the smaller
//! child is built directly and the sibling is derived from the parent.
//! Split thresholds are translated from bin ids to raw feature values as
//! nodes are recorded, so the finished tree needs no bin mappers.

use std::collections::VecDeque;

use crate::data::BinnedDataset;
use crate::repr::{MutableTree, NodeId, Tree};
use crate::training::histogram::{
    build_histogram, new_histogram, subtract_histogram, HistogramBin,
};
use crate::training::params::{GrowthStrategy, TrainParams};
use crate::training::partition::{LeafId, RowPartitioner};
use crate::training::split::{find_best_split, node_totals, GainParams, SplitInfo};
use crate::utils::Parallelism;

/// A frontier node during growth.
struct NodeState {
    node: NodeId,
    leaf: LeafId,
    depth: u32,
    totals: HistogramBin,
    histogram: Vec<HistogramBin>,
}

/// Grows one regression tree per call, reusing its partitioner across
/// rounds.
pub struct TreeGrower<'a> {
    binned: &'a BinnedDataset,
    gain: GainParams,
    growth: GrowthStrategy,
    parallelism: Parallelism,
    partitioner: RowPartitioner,
    max_leaves: usize,
}

impl<'a> TreeGrower<'a> {
    pub fn new(binned: &'a BinnedDataset, params: &TrainParams, parallelism: Parallelism) -> Self {
        // Every split leaves both children non-empty, so a tree never has
        // more leaves than rows. Clamping keeps partitioner and builder
        // allocations row-bounded for deep depth budgets.
        let max_leaves = params.growth.max_leaves().min(binned.n_rows().max(1));
        Self {
            binned,
            gain: GainParams::from(params),
            growth: params.growth,
            parallelism,
            partitioner: RowPartitioner::new(binned.n_rows(), max_leaves),
            max_leaves,
        }
    }

    /// Grow one tree against the current gradients.
    ///
    /// Leaf values come out scaled by `learning_rate`, and `raw_scores`
    /// is updated in place with each row's new leaf contribution via the
    /// partitioner's leaf ranges.
    pub fn grow(
        &mut self,
        grad: &[f32],
        hess: &[f32],
        learning_rate: f32,
        raw_scores: &mut [f32],
    ) -> Tree {
        self.partitioner.reset();

        let max_leaves = self.max_leaves;
        let mut builder = MutableTree::with_capacity(2 * max_leaves);
        let root = builder.init_root();

        let mut histogram = new_histogram(self.binned);
        build_histogram(
            &mut histogram,
            self.binned,
            grad,
            hess,
            self.partitioner.leaf_rows(0),
            self.parallelism,
        );
        let totals = node_totals(&histogram, self.binned);
        let root_state = NodeState { node: root, leaf: 0, depth: 0, totals, histogram };

        let mut leaves: Vec<(LeafId, f32)> = Vec::with_capacity(max_leaves);
        match self.growth {
            GrowthStrategy::DepthWise { max_depth } => {
                self.grow_depth_wise(&mut builder, root_state, max_depth, grad, hess, &mut leaves);
            }
            GrowthStrategy::LeafWise { max_leaves } => {
                self.grow_leaf_wise(&mut builder, root_state, max_leaves, grad, hess, &mut leaves);
            }
        }

        builder.apply_learning_rate(learning_rate);
        for &(leaf, value) in &leaves {
            let delta = value * learning_rate;
            for &row in self.partitioner.leaf_rows(leaf) {
                raw_scores[row as usize] += delta;
            }
        }

        builder.freeze()
    }

    fn grow_depth_wise(
        &mut self,
        builder: &mut MutableTree,
        root: NodeState,
        max_depth: u32,
        grad: &[f32],
        hess: &[f32],
        leaves: &mut Vec<(LeafId, f32)>,
    ) {
        let mut queue = VecDeque::new();
        queue.push_back(root);

        while let Some(state) = queue.pop_front() {
            let split = if state.depth < max_depth {
                find_best_split(&state.histogram, self.binned, &state.totals, &self.gain)
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right) = self.expand(builder, state, &split, grad, hess);
                    queue.push_back(left);
                    queue.push_back(right);
                }
                None => self.seal_leaf(builder, &state, leaves),
            }
        }
    }

    fn grow_leaf_wise(
        &mut self,
        builder: &mut MutableTree,
        root: NodeState,
        max_leaves: u32,
        grad: &[f32],
        hess: &[f32],
        leaves: &mut Vec<(LeafId, f32)>,
    ) {
        let root_split = find_best_split(&root.histogram, self.binned, &root.totals, &self.gain);
        let mut candidates: Vec<(NodeState, Option<SplitInfo>)> = vec![(root, root_split)];
        let mut n_leaves = 1u32;

        while n_leaves < max_leaves {
            // Strictly-greater comparison in creation order keeps equal
            // gains deterministic.
            let mut best: Option<(usize, f32)> = None;
            for (i, (_, split)) in candidates.iter().enumerate() {
                if let Some(split) = split {
                    if best.map_or(true, |(_, gain)| split.gain > gain) {
                        best = Some((i, split.gain));
                    }
                }
            }
            let Some((idx, _)) = best else { break };

            let (state, split) = candidates.remove(idx);
            let Some(split) = split else {
                candidates.push((state, None));
                break;
            };
            let (left, right) = self.expand(builder, state, &split, grad, hess);
            n_leaves += 1;

            for child in [left, right] {
                let child_split =
                    find_best_split(&child.histogram, self.binned, &child.totals, &self.gain);
                candidates.push((child, child_split));
            }
        }

        for (state, _) in &candidates {
            self.seal_leaf(builder, state, leaves);
        }
    }

    /// Split one frontier node, producing its child states.
    fn expand(
        &mut self,
        builder: &mut MutableTree,
        state: NodeState,
        split: &SplitInfo,
        grad: &[f32],
        hess: &[f32],
    ) -> (NodeState, NodeState) {
        let threshold = self.binned.mapper(split.feature as usize).threshold_for_bin(split.bin);
        let (left_node, right_node) = builder.apply_split(state.node, split.feature, threshold, true);

        let NodeState { leaf: left_leaf, depth, histogram: mut parent_hist, .. } = state;
        let (right_leaf, left_count, right_count) =
            self.partitioner.split(left_leaf, split, self.binned);
        debug_assert_eq!(left_count, split.left.count);
        debug_assert_eq!(right_count, split.right.count);

        // Build the smaller child directly, derive the sibling from the
        // parent histogram.
        let mut small_hist = new_histogram(self.binned);
        let small_leaf = if left_count <= right_count { left_leaf } else { right_leaf };
        build_histogram(
            &mut small_hist,
            self.binned,
            grad,
            hess,
            self.partitioner.leaf_rows(small_leaf),
            self.parallelism,
        );
        subtract_histogram(&mut parent_hist, &small_hist);

        let (left_hist, right_hist) = if left_count <= right_count {
            (small_hist, parent_hist)
        } else {
            (parent_hist, small_hist)
        };

        let left = NodeState {
            node: left_node,
            leaf: left_leaf,
            depth: depth + 1,
            totals: split.left,
            histogram: left_hist,
        };
        let right = NodeState {
            node: right_node,
            leaf: right_leaf,
            depth: depth + 1,
            totals: split.right,
            histogram: right_hist,
        };
        (left, right)
    }

    fn seal_leaf(&self, builder: &mut MutableTree, state: &NodeState, leaves: &mut Vec<(LeafId, f32)>) {
        let value = self.gain.leaf_weight(&state.totals);
        builder.make_leaf(state.node, value);
        leaves.push((state.leaf, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn separable_inputs() -> (BinnedDataset, Vec<f32>, Vec<f32>) {
        // Feature 1 separates the gradient signs cleanly.
        let columns = vec![
            vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
            vec![0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0],
        ];
        let binned = BinnedDataset::from_columns(&columns, 8);
        let grad = vec![0.5, 0.5, 0.5, 0.5, -0.5, -0.5, -0.5, -0.5];
        let hess = vec![1.0f32; 8];
        (binned, grad, hess)
    }

    fn params(growth: GrowthStrategy) -> TrainParams {
        TrainParams {
            growth,
            min_samples_leaf: 1,
            ..Default::default()
        }
    }

    #[test]
    fn grows_separating_stump() {
        let (binned, grad, hess) = separable_inputs();
        let params = params(GrowthStrategy::DepthWise { max_depth: 1 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);

        assert_eq!(tree.n_leaves(), 2);
        assert_eq!(tree.split_feature(0), 1);
        // leaf weight = -G/(H + lambda) = -2/(4 + 1)
        assert_relative_eq!(tree.predict_row(&[0.0, 0.0]), -0.4, epsilon = 1e-6);
        assert_relative_eq!(tree.predict_row(&[0.0, 9.0]), 0.4, epsilon = 1e-6);
    }

    #[test]
    fn raw_scores_match_tree_output() {
        let (binned, grad, hess) = separable_inputs();
        let params = params(GrowthStrategy::DepthWise { max_depth: 3 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 0.3, &mut raw);

        let columns = [
            [1.0, 2.0, 1.0, 2.0, 1.0, 2.0, 1.0, 2.0],
            [0.0, 0.0, 0.0, 0.0, 9.0, 9.0, 9.0, 9.0],
        ];
        for row in 0..8 {
            let features = [columns[0][row], columns[1][row]];
            assert_relative_eq!(raw[row], tree.predict_row(&features), epsilon = 1e-6);
        }
    }

    #[test]
    fn depth_limit_is_honored() {
        let (binned, _, _) = separable_inputs();
        // Noisy gradients so deeper splits stay attractive.
        let grad = vec![0.9, -0.3, 0.4, -0.8, 0.2, -0.6, 0.7, -0.1];
        let hess = vec![1.0f32; 8];
        let params = params(GrowthStrategy::DepthWise { max_depth: 2 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);
        assert!(tree.depth() <= 2);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn leaf_wise_respects_leaf_cap() {
        let (binned, _, _) = separable_inputs();
        let grad = vec![0.9, -0.3, 0.4, -0.8, 0.2, -0.6, 0.7, -0.1];
        let hess = vec![1.0f32; 8];
        let params = params(GrowthStrategy::LeafWise { max_leaves: 3 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);
        assert!(tree.n_leaves() <= 3);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn deep_depth_budget_allocates_by_rows_not_depth() {
        // max_depth 31 implies a 2^31 leaf bound; with 8 rows the grower
        // must only ever allocate for 8 leaves.
        let (binned, grad, hess) = separable_inputs();
        let params = params(GrowthStrategy::DepthWise { max_depth: 31 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);
        assert!(tree.n_leaves() <= 8);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn huge_leaf_budget_allocates_by_rows() {
        let (binned, grad, hess) = separable_inputs();
        let params = params(GrowthStrategy::LeafWise { max_leaves: u32::MAX });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);
        assert!(tree.n_leaves() <= 8);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn uniform_gradients_give_single_leaf() {
        let (binned, _, hess) = separable_inputs();
        let grad = vec![0.25f32; 8];
        let params = params(GrowthStrategy::DepthWise { max_depth: 5 });
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);

        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);
        assert_eq!(tree.n_nodes(), 1);
        // Every row gets the same Newton step.
        assert_relative_eq!(raw[0], -2.0 / 9.0, epsilon = 1e-6);
        assert!(raw.iter().all(|&r| (r - raw[0]).abs() < 1e-7));
    }

    #[test]
    fn min_samples_leaf_blocks_unbalanced_split() {
        let columns = vec![vec![0.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0, 5.0]];
        let binned = BinnedDataset::from_columns(&columns, 8);
        let grad = vec![1.0, -0.2, -0.2, -0.2, -0.2, -0.2, -0.2, -0.2];
        let hess = vec![1.0f32; 8];

        let params = TrainParams {
            growth: GrowthStrategy::DepthWise { max_depth: 3 },
            min_samples_leaf: 2,
            ..Default::default()
        };
        let mut grower = TreeGrower::new(&binned, &params, Parallelism::Sequential);
        let mut raw = vec![0.0f32; 8];
        let tree = grower.grow(&grad, &hess, 1.0, &mut raw);

        // The only candidate split isolates a single row.
        assert_eq!(tree.n_nodes(), 1);
    }
}

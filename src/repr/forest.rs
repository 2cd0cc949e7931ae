//! Additive ensemble of regression trees.

use rayon::prelude::*;

use crate::repr::tree::Tree;
use crate::utils::Parallelism;

/// Trained ensemble: a base score plus the sum of tree outputs.
///
/// Tree leaf values already include the learning rate, so the raw score
/// for a sample is `base_score + sum(tree.predict_row(x))`. The raw score
/// is in log-odds space; callers apply the sigmoid to get a probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest {
    trees: Vec<Tree>,
    base_score: f32,
}

impl Forest {
    /// Create an empty forest with the given base score.
    pub fn new(base_score: f32) -> Self {
        Self { trees: Vec::new(), base_score }
    }

    /// Create a forest from already-built trees.
    pub fn from_trees(trees: Vec<Tree>, base_score: f32) -> Self {
        Self { trees, base_score }
    }

    /// Append a finished tree.
    pub fn push_tree(&mut self, tree: Tree) {
        self.trees.push(tree);
    }

    /// Drop trees past `n_trees`. Used by early stopping to roll the
    /// ensemble back to its best round.
    pub fn truncate(&mut self, n_trees: usize) {
        self.trees.truncate(n_trees);
    }

    /// Number of trees in the ensemble.
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// The trees, in boosting order.
    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Constant added to every prediction before tree contributions.
    pub fn base_score(&self) -> f32 {
        self.base_score
    }

    /// Raw (log-odds) score for one sample.
    #[inline]
    pub fn predict_raw(&self, features: &[f32]) -> f32 {
        let mut score = self.base_score;
        for tree in &self.trees {
            score += tree.predict_row(features);
        }
        score
    }

    /// Raw scores for a batch of samples, written into `out`.
    ///
    /// `features` holds rows of `n_features` values each; `out` must have
    /// one slot per row.
    pub fn predict_raw_into(
        &self,
        features: &[f32],
        n_features: usize,
        out: &mut [f32],
        parallelism: Parallelism,
    ) {
        debug_assert_eq!(features.len(), out.len() * n_features);
        match parallelism {
            Parallelism::Parallel => {
                features
                    .par_chunks_exact(n_features)
                    .zip(out.par_iter_mut())
                    .for_each(|(row, slot)| *slot = self.predict_raw(row));
            }
            Parallelism::Sequential => {
                for (row, slot) in features.chunks_exact(n_features).zip(out.iter_mut()) {
                    *slot = self.predict_raw(row);
                }
            }
        }
    }
}

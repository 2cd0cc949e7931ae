//! Postcard payload schema for model artifacts.
//!
//! The on-disk payload mirrors the in-memory model with plain owned
//! vectors so the wire schema stays decoupled from the runtime
//! representation. The top-level enum is version-tagged; decoding an
//! artifact written by a newer minor revision fails cleanly instead of
//! misreading it.

use serde::{Deserialize, Serialize};

use crate::model::{CreditModel, ModelMeta};
use crate::preprocess::MedianImputer;
use crate::repr::{Forest, Tree, TreeValidationError};

/// Version-tagged artifact payload.
#[derive(Debug, Serialize, Deserialize)]
pub enum Payload {
    V1(PayloadV1),
}

/// Payload schema for format version 1.
#[derive(Debug, Serialize, Deserialize)]
pub struct PayloadV1 {
    pub meta: ModelMeta,
    pub imputer: ImputerPayload,
    pub forest: ForestPayload,
}

/// Fitted median imputer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImputerPayload {
    pub columns: Vec<u32>,
    pub medians: Vec<f32>,
}

/// One tree's node arrays.
#[derive(Debug, Serialize, Deserialize)]
pub struct TreePayload {
    pub split_features: Vec<u32>,
    pub split_thresholds: Vec<f32>,
    pub left_children: Vec<u32>,
    pub right_children: Vec<u32>,
    pub default_left: Vec<bool>,
    pub is_leaf: Vec<bool>,
    pub leaf_values: Vec<f32>,
}

/// The full ensemble.
#[derive(Debug, Serialize, Deserialize)]
pub struct ForestPayload {
    pub base_score: f32,
    pub trees: Vec<TreePayload>,
}

impl From<&MedianImputer> for ImputerPayload {
    fn from(imputer: &MedianImputer) -> Self {
        Self {
            columns: imputer.columns().iter().map(|&c| c as u32).collect(),
            medians: imputer.medians().to_vec(),
        }
    }
}

impl ImputerPayload {
    pub fn into_imputer(self) -> MedianImputer {
        MedianImputer::from_parts(
            self.columns.into_iter().map(|c| c as usize).collect(),
            self.medians,
        )
    }
}

impl From<&Tree> for TreePayload {
    fn from(tree: &Tree) -> Self {
        let arrays = tree.as_arrays();
        Self {
            split_features: arrays.split_features.to_vec(),
            split_thresholds: arrays.split_thresholds.to_vec(),
            left_children: arrays.left_children.to_vec(),
            right_children: arrays.right_children.to_vec(),
            default_left: arrays.default_left.to_vec(),
            is_leaf: arrays.is_leaf.to_vec(),
            leaf_values: arrays.leaf_values.to_vec(),
        }
    }
}

impl TreePayload {
    /// Reassemble a [`Tree`], validating topology and that every split
    /// stays within the `n_features`-wide schema. A decoded artifact must
    /// never be able to index past a feature array at prediction time.
    pub fn into_tree(self, n_features: usize) -> Result<Tree, TreeValidationError> {
        let n_nodes = self.is_leaf.len();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }
        if self.split_features.len() != n_nodes
            || self.split_thresholds.len() != n_nodes
            || self.left_children.len() != n_nodes
            || self.right_children.len() != n_nodes
            || self.default_left.len() != n_nodes
            || self.leaf_values.len() != n_nodes
        {
            return Err(TreeValidationError::ArrayLengthMismatch);
        }

        let tree = Tree::new(
            self.split_features,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
        );
        tree.validate()?;
        for node in 0..tree.n_nodes() as u32 {
            if !tree.is_leaf(node) && tree.split_feature(node) as usize >= n_features {
                return Err(TreeValidationError::SplitFeatureOutOfBounds {
                    node,
                    feature: tree.split_feature(node),
                    n_features,
                });
            }
        }
        Ok(tree)
    }
}

impl From<&Forest> for ForestPayload {
    fn from(forest: &Forest) -> Self {
        Self {
            base_score: forest.base_score(),
            trees: forest.trees().iter().map(TreePayload::from).collect(),
        }
    }
}

impl ForestPayload {
    pub fn into_forest(self, n_features: usize) -> Result<Forest, TreeValidationError> {
        let trees = self
            .trees
            .into_iter()
            .map(|tree| tree.into_tree(n_features))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Forest::from_trees(trees, self.base_score))
    }
}

impl From<&CreditModel> for Payload {
    fn from(model: &CreditModel) -> Self {
        Payload::V1(PayloadV1 {
            meta: model.meta().clone(),
            imputer: ImputerPayload::from(model.imputer()),
            forest: ForestPayload::from(model.forest()),
        })
    }
}

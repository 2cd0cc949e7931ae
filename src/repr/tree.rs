//! Regression tree storage and traversal.
//!
//! [`Tree`] is immutable structure-of-arrays storage for cache-friendly
//! root-to-leaf traversal; [`MutableTree`] is the builder used during
//! growth, frozen into a [`Tree`] when the tree is complete. Split
//! thresholds are raw feature values, so inference needs no bin mappers.

/// Node identifier within one tree (0 = root).
pub type NodeId = u32;

/// Structural validation errors for [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValidationError {
    /// Tree has no nodes.
    EmptyTree,
    /// Node arrays disagree on length.
    ArrayLengthMismatch,
    /// A child pointer references an out-of-bounds node.
    ChildOutOfBounds { node: NodeId, child: NodeId, n_nodes: usize },
    /// A node references itself as a child.
    SelfLoop { node: NodeId },
    /// A node was reached by more than one path, or a cycle exists.
    DuplicateVisit { node: NodeId },
    /// A node exists in storage but is unreachable from the root.
    UnreachableNode { node: NodeId },
    /// A split node references a feature outside the schema.
    SplitFeatureOutOfBounds { node: NodeId, feature: u32, n_features: usize },
}

/// Structure-of-Arrays tree storage.
///
/// Child indices are local to this tree. Leaf values are stored with the
/// learning rate already applied, so prediction is a plain sum over trees.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    split_features: Box<[u32]>,
    split_thresholds: Box<[f32]>,
    left_children: Box<[u32]>,
    right_children: Box<[u32]>,
    default_left: Box<[bool]>,
    is_leaf: Box<[bool]>,
    leaf_values: Box<[f32]>,
}

impl Tree {
    /// Create a tree from parallel arrays. All arrays must share a length.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        split_features: Vec<u32>,
        split_thresholds: Vec<f32>,
        left_children: Vec<u32>,
        right_children: Vec<u32>,
        default_left: Vec<bool>,
        is_leaf: Vec<bool>,
        leaf_values: Vec<f32>,
    ) -> Self {
        let n_nodes = is_leaf.len();
        debug_assert_eq!(n_nodes, split_features.len());
        debug_assert_eq!(n_nodes, split_thresholds.len());
        debug_assert_eq!(n_nodes, left_children.len());
        debug_assert_eq!(n_nodes, right_children.len());
        debug_assert_eq!(n_nodes, default_left.len());
        debug_assert_eq!(n_nodes, leaf_values.len());

        Self {
            split_features: split_features.into_boxed_slice(),
            split_thresholds: split_thresholds.into_boxed_slice(),
            left_children: left_children.into_boxed_slice(),
            right_children: right_children.into_boxed_slice(),
            default_left: default_left.into_boxed_slice(),
            is_leaf: is_leaf.into_boxed_slice(),
            leaf_values: leaf_values.into_boxed_slice(),
        }
    }

    /// Number of nodes in the tree.
    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Number of leaves in the tree.
    pub fn n_leaves(&self) -> usize {
        self.is_leaf.iter().filter(|&&l| l).count()
    }

    /// Check if a node is a leaf.
    #[inline]
    pub fn is_leaf(&self, node: NodeId) -> bool {
        self.is_leaf[node as usize]
    }

    /// Feature index tested at a split node.
    #[inline]
    pub fn split_feature(&self, node: NodeId) -> u32 {
        self.split_features[node as usize]
    }

    /// Raw threshold at a split node (`value < threshold` goes left).
    #[inline]
    pub fn split_threshold(&self, node: NodeId) -> f32 {
        self.split_thresholds[node as usize]
    }

    /// Left child of a split node.
    #[inline]
    pub fn left_child(&self, node: NodeId) -> NodeId {
        self.left_children[node as usize]
    }

    /// Right child of a split node.
    #[inline]
    pub fn right_child(&self, node: NodeId) -> NodeId {
        self.right_children[node as usize]
    }

    /// Default direction for non-finite values at a split node.
    #[inline]
    pub fn default_left(&self, node: NodeId) -> bool {
        self.default_left[node as usize]
    }

    /// Output value at a leaf node.
    #[inline]
    pub fn leaf_value(&self, node: NodeId) -> f32 {
        self.leaf_values[node as usize]
    }

    /// Raw node arrays, in node-id order. Used by the persistence layer.
    pub fn as_arrays(&self) -> TreeArrays<'_> {
        TreeArrays {
            split_features: &self.split_features,
            split_thresholds: &self.split_thresholds,
            left_children: &self.left_children,
            right_children: &self.right_children,
            default_left: &self.default_left,
            is_leaf: &self.is_leaf,
            leaf_values: &self.leaf_values,
        }
    }

    /// Maximum depth of the tree (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(tree: &Tree, node: NodeId) -> usize {
            if tree.is_leaf(node) {
                0
            } else {
                1 + walk(tree, tree.left_child(node)).max(walk(tree, tree.right_child(node)))
            }
        }
        walk(self, 0)
    }

    /// Traverse from the root to the leaf matching `features`.
    ///
    /// NaN values follow the node's default direction.
    #[inline]
    pub fn traverse_to_leaf(&self, features: &[f32]) -> NodeId {
        let mut node: NodeId = 0;
        while !self.is_leaf(node) {
            let value = features[self.split_feature(node) as usize];
            node = if value.is_nan() {
                if self.default_left(node) {
                    self.left_child(node)
                } else {
                    self.right_child(node)
                }
            } else if value < self.split_threshold(node) {
                self.left_child(node)
            } else {
                self.right_child(node)
            };
        }
        node
    }

    /// Leaf value this tree contributes for one sample.
    #[inline]
    pub fn predict_row(&self, features: &[f32]) -> f32 {
        self.leaf_value(self.traverse_to_leaf(features))
    }

    /// Validate basic structural invariants.
    ///
    /// Used when loading persisted models and in debug checks: every node
    /// must be reachable exactly once from the root and all child pointers
    /// must stay in bounds.
    pub fn validate(&self) -> Result<(), TreeValidationError> {
        let n_nodes = self.n_nodes();
        if n_nodes == 0 {
            return Err(TreeValidationError::EmptyTree);
        }

        let mut visited = vec![false; n_nodes];
        let mut stack: Vec<NodeId> = vec![0];

        while let Some(node) = stack.pop() {
            let idx = node as usize;
            if visited[idx] {
                return Err(TreeValidationError::DuplicateVisit { node });
            }
            visited[idx] = true;

            if !self.is_leaf(node) {
                let left = self.left_child(node);
                let right = self.right_child(node);

                if left == node || right == node {
                    return Err(TreeValidationError::SelfLoop { node });
                }
                for child in [left, right] {
                    if child as usize >= n_nodes {
                        return Err(TreeValidationError::ChildOutOfBounds { node, child, n_nodes });
                    }
                }
                stack.push(right);
                stack.push(left);
            }
        }

        if let Some(node) = visited.iter().position(|&v| !v) {
            return Err(TreeValidationError::UnreachableNode { node: node as NodeId });
        }

        Ok(())
    }
}

/// Borrowed view of a tree's node arrays.
#[derive(Debug, Clone, Copy)]
pub struct TreeArrays<'a> {
    pub split_features: &'a [u32],
    pub split_thresholds: &'a [f32],
    pub left_children: &'a [u32],
    pub right_children: &'a [u32],
    pub default_left: &'a [bool],
    pub is_leaf: &'a [bool],
    pub leaf_values: &'a [f32],
}

/// Placeholder child index for nodes that are not yet split.
const NO_CHILD: u32 = u32::MAX;

/// Mutable tree under construction during training.
///
/// Nodes are appended as splits are applied; [`freeze`](Self::freeze)
/// produces the immutable [`Tree`].
#[derive(Debug, Clone, Default)]
pub struct MutableTree {
    split_features: Vec<u32>,
    split_thresholds: Vec<f32>,
    left_children: Vec<u32>,
    right_children: Vec<u32>,
    default_left: Vec<bool>,
    is_leaf: Vec<bool>,
    leaf_values: Vec<f32>,
}

impl MutableTree {
    /// Create an empty builder with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            split_features: Vec::with_capacity(capacity),
            split_thresholds: Vec::with_capacity(capacity),
            left_children: Vec::with_capacity(capacity),
            right_children: Vec::with_capacity(capacity),
            default_left: Vec::with_capacity(capacity),
            is_leaf: Vec::with_capacity(capacity),
            leaf_values: Vec::with_capacity(capacity),
        }
    }

    /// Number of nodes allocated so far.
    pub fn n_nodes(&self) -> usize {
        self.is_leaf.len()
    }

    /// Clear all nodes, keeping allocations.
    pub fn reset(&mut self) {
        self.split_features.clear();
        self.split_thresholds.clear();
        self.left_children.clear();
        self.right_children.clear();
        self.default_left.clear();
        self.is_leaf.clear();
        self.leaf_values.clear();
    }

    fn push_node(&mut self) -> NodeId {
        let id = self.n_nodes() as NodeId;
        self.split_features.push(0);
        self.split_thresholds.push(0.0);
        self.left_children.push(NO_CHILD);
        self.right_children.push(NO_CHILD);
        self.default_left.push(true);
        self.is_leaf.push(false);
        self.leaf_values.push(0.0);
        id
    }

    /// Allocate the root node. Must be called exactly once, first.
    pub fn init_root(&mut self) -> NodeId {
        debug_assert_eq!(self.n_nodes(), 0);
        self.push_node()
    }

    /// Turn `node` into a split on `feature` at a raw-value `threshold`,
    /// allocating and returning `(left, right)` children.
    pub fn apply_split(
        &mut self,
        node: NodeId,
        feature: u32,
        threshold: f32,
        default_left: bool,
    ) -> (NodeId, NodeId) {
        let left = self.push_node();
        let right = self.push_node();

        let idx = node as usize;
        self.split_features[idx] = feature;
        self.split_thresholds[idx] = threshold;
        self.left_children[idx] = left;
        self.right_children[idx] = right;
        self.default_left[idx] = default_left;
        self.is_leaf[idx] = false;

        (left, right)
    }

    /// Turn `node` into a leaf with the given output value.
    pub fn make_leaf(&mut self, node: NodeId, value: f32) {
        let idx = node as usize;
        self.is_leaf[idx] = true;
        self.leaf_values[idx] = value;
    }

    /// Scale every leaf value by the learning rate.
    pub fn apply_learning_rate(&mut self, learning_rate: f32) {
        for (value, &leaf) in self.leaf_values.iter_mut().zip(&self.is_leaf) {
            if leaf {
                *value *= learning_rate;
            }
        }
    }

    /// Freeze into an immutable [`Tree`].
    pub fn freeze(self) -> Tree {
        debug_assert!(
            self.is_leaf
                .iter()
                .enumerate()
                .all(|(i, &leaf)| leaf || self.left_children[i] != NO_CHILD),
            "unfinished node left in builder"
        );

        Tree::new(
            self.split_features,
            self.split_thresholds,
            self.left_children,
            self.right_children,
            self.default_left,
            self.is_leaf,
            self.leaf_values,
        )
    }
}

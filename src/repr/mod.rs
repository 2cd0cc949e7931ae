//! Immutable model representation: trees and the forest.

pub mod forest;
pub mod tree;

pub use forest::Forest;
pub use tree::{MutableTree, NodeId, Tree, TreeArrays, TreeValidationError};

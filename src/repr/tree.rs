//! Decision tree nodes.

use crate::data::FeatureSource;
use crate::repr::ParamVec;

/// A node in a decision tree.
///
/// A tree is either a leaf carrying action parameters, or an axis-aligned
/// branch on a single feature. Children are owned by value; the structure is
/// built bottom-up once and never restructured afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Tree {
    /// Leaf node with the parameters produced for the samples it represents.
    Leaf {
        /// Parameter vector of length equal to the model dimension.
        params: ParamVec,
    },
    /// Branching node: samples with `features[feature] < threshold` descend
    /// into `less_than`, all others into `greater_equal`.
    Branch {
        feature: u32,
        threshold: f64,
        less_than: Box<Tree>,
        greater_equal: Box<Tree>,
    },
}

impl Tree {
    /// Create a leaf node.
    pub fn leaf(params: ParamVec) -> Self {
        Tree::Leaf { params }
    }

    /// Create a branching node.
    pub fn branch(feature: u32, threshold: f64, less_than: Tree, greater_equal: Tree) -> Self {
        Tree::Branch {
            feature,
            threshold,
            less_than: Box::new(less_than),
            greater_equal: Box::new(greater_equal),
        }
    }

    /// Whether this node is a leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Tree::Leaf { .. })
    }

    /// Descend to the leaf for the given feature row.
    pub fn apply(&self, features: &[f64]) -> &ParamVec {
        match self {
            Tree::Leaf { params } => params,
            Tree::Branch {
                feature,
                threshold,
                less_than,
                greater_equal,
            } => {
                if features[*feature as usize] < *threshold {
                    less_than.apply(features)
                } else {
                    greater_equal.apply(features)
                }
            }
        }
    }

    /// Descend to the leaf for the given feature source.
    ///
    /// Only the features named by branch nodes are read, so sparse or lazily
    /// decoded sources pay for exactly the lookups the descent needs.
    pub fn apply_source<F: FeatureSource + ?Sized>(&self, source: &F) -> &ParamVec {
        match self {
            Tree::Leaf { params } => params,
            Tree::Branch {
                feature,
                threshold,
                less_than,
                greater_equal,
            } => {
                if source.feature(*feature as usize) < *threshold {
                    less_than.apply_source(source)
                } else {
                    greater_equal.apply_source(source)
                }
            }
        }
    }

    /// Length of the parameter vectors stored in this tree's leaves.
    pub fn param_dim(&self) -> usize {
        match self {
            Tree::Leaf { params } => params.len(),
            Tree::Branch { less_than, .. } => less_than.param_dim(),
        }
    }

    /// Maximum number of branches on any root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Tree::Leaf { .. } => 0,
            Tree::Branch {
                less_than,
                greater_equal,
                ..
            } => 1 + less_than.depth().max(greater_equal.depth()),
        }
    }

    /// Number of leaves.
    pub fn num_leaves(&self) -> usize {
        match self {
            Tree::Leaf { .. } => 1,
            Tree::Branch {
                less_than,
                greater_equal,
                ..
            } => less_than.num_leaves() + greater_equal.num_leaves(),
        }
    }

    /// Multiply every leaf's parameters by `scale`.
    pub fn scale_params(&mut self, scale: f64) {
        match self {
            Tree::Leaf { params } => params.scale(scale),
            Tree::Branch {
                less_than,
                greater_equal,
                ..
            } => {
                less_than.scale_params(scale);
                greater_equal.scale_params(scale);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: u32, threshold: f64, left: f64, right: f64) -> Tree {
        Tree::branch(
            feature,
            threshold,
            Tree::leaf(ParamVec::from(vec![left])),
            Tree::leaf(ParamVec::from(vec![right])),
        )
    }

    #[test]
    fn apply_descends_on_threshold() {
        let tree = stump(0, 0.5, 1.0, 2.0);
        assert_eq!(tree.apply(&[0.3])[0], 1.0);
        assert_eq!(tree.apply(&[0.7])[0], 2.0);
        // Values exactly at the threshold go to the greater-equal side.
        assert_eq!(tree.apply(&[0.5])[0], 2.0);
    }

    #[test]
    fn apply_nested() {
        let tree = Tree::branch(
            1,
            0.0,
            stump(0, -1.0, 1.0, 2.0),
            stump(0, 1.0, 3.0, 4.0),
        );
        assert_eq!(tree.apply(&[-2.0, -1.0])[0], 1.0);
        assert_eq!(tree.apply(&[0.0, -1.0])[0], 2.0);
        assert_eq!(tree.apply(&[0.0, 1.0])[0], 3.0);
        assert_eq!(tree.apply(&[2.0, 1.0])[0], 4.0);
    }

    #[test]
    fn shape_accessors() {
        let tree = Tree::branch(1, 0.0, stump(0, -1.0, 1.0, 2.0), Tree::leaf(ParamVec::zeros(1)));
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.num_leaves(), 3);
        assert_eq!(tree.param_dim(), 1);
        assert!(!tree.is_leaf());
    }

    #[test]
    fn scale_params_hits_every_leaf() {
        let mut tree = stump(0, 0.0, 1.0, -2.0);
        tree.scale_params(0.5);
        assert_eq!(tree.apply(&[-1.0])[0], 0.5);
        assert_eq!(tree.apply(&[1.0])[0], -1.0);
    }
}

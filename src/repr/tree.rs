//! Canonical decision tree representation.
//!
//! A tree is a tagged recursive structure: every node is either a
//! [`TreeNode::Leaf`] carrying a constant output, or a [`TreeNode::Split`]
//! on one numeric feature. The left child holds the rows with
//! `x[feature] <= threshold`, the right child the rows with
//! `x[feature] > threshold`.
//!
//! Trees are built by the loaders in [`crate::compat`] and never mutated
//! afterwards.

use serde::Serialize;

/// A node of a decision tree (and, at the root, the whole tree).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Terminal node with a constant prediction.
    Leaf { value: f64 },
    /// Numeric split: left if `x[feature] <= threshold`, right otherwise.
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    /// Create a leaf node.
    pub fn leaf(value: f64) -> Self {
        TreeNode::Leaf { value }
    }

    /// Create a split node.
    pub fn split(feature: usize, threshold: f64, left: TreeNode, right: TreeNode) -> Self {
        TreeNode::Split {
            feature,
            threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Whether this node is a leaf.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    /// Number of leaves below (and including) this node.
    pub fn n_leaves(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                TreeNode::Leaf { .. } => count += 1,
                TreeNode::Split { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        count
    }

    /// Length of the longest root-to-leaf path, counted in splits.
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            match node {
                TreeNode::Leaf { .. } => max_depth = max_depth.max(depth),
                TreeNode::Split { left, right, .. } => {
                    stack.push((right, depth + 1));
                    stack.push((left, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Largest feature index referenced by any split, if any.
    pub fn max_feature(&self) -> Option<usize> {
        let mut max = None;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                max = Some(max.map_or(*feature, |m: usize| m.max(*feature)));
                stack.push(right);
                stack.push(left);
            }
        }
        max
    }

    /// Route one row to its leaf and return the leaf value.
    ///
    /// # Panics
    ///
    /// Panics if a split references a feature beyond `features.len()`.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

//! Canonical ensemble representation (collection of regression trees).

use serde::Serialize;

use super::TreeNode;

/// A trained single-output tree ensemble plus the metadata needed to embed it.
///
/// Leaf values are stored as dumped by the training library. The ensemble
/// output is `base + learning_rate * Σ tree(x)` where the base score is
/// supplied separately (see [`crate::ensemble::Treemax`]).
#[derive(Debug, Clone, Serialize)]
pub struct TreeEnsemble {
    trees: Vec<TreeNode>,
    feature_names: Vec<String>,
    learning_rate: f64,
    objective: Option<String>,
}

impl TreeEnsemble {
    /// Create an empty ensemble over the given features.
    pub fn new(feature_names: Vec<String>, learning_rate: f64) -> Self {
        Self {
            trees: Vec::new(),
            feature_names,
            learning_rate,
            objective: None,
        }
    }

    /// Create an ensemble with `n_features` features named `Column_0..`.
    pub fn with_n_features(n_features: usize, learning_rate: f64) -> Self {
        let names = (0..n_features).map(|i| format!("Column_{i}")).collect();
        Self::new(names, learning_rate)
    }

    /// Record the training objective the trees were fitted with.
    pub fn with_objective(mut self, objective: impl Into<String>) -> Self {
        self.objective = Some(objective.into());
        self
    }

    /// Add a tree to the ensemble.
    pub fn push_tree(&mut self, tree: TreeNode) {
        self.trees.push(tree);
    }

    /// Number of trees.
    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of input features.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Ordered feature names.
    #[inline]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Shrinkage applied to the sum of tree outputs.
    #[inline]
    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Training objective, when known.
    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    /// Get a reference to a specific tree.
    #[inline]
    pub fn tree(&self, idx: usize) -> &TreeNode {
        &self.trees[idx]
    }

    /// Iterate over trees.
    pub fn trees(&self) -> impl Iterator<Item = &TreeNode> {
        self.trees.iter()
    }

    /// Shrunken sum of tree outputs for one row, without any base score.
    ///
    /// # Panics
    ///
    /// Panics if a split references a feature beyond `features.len()`.
    pub fn predict_row_raw(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict_row(features)).sum();
        self.learning_rate * sum
    }
}

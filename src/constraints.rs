//! Tree-to-constraint compiler.
//!
//! [`TreeConstraints`] flattens the [`LeafPath`]s of one tree into a table with
//! one row per (leaf, split edge). Every row has the form
//!
//! ```text
//! coeff · x[feature] <= threshold
//! ```
//!
//! with `coeff = +1, threshold = θ` for a left edge (`x <= θ`) and
//! `coeff = -1, threshold = -θ + ε` for a right edge (`x > θ`, closed off as
//! `x >= θ - ε`). [`TreeConstraints::embed`] turns the table into big-M rows
//! guarded by one binary selector per leaf, an exactly-one-leaf row, and the
//! row linking the tree output to the selected leaf value:
//!
//! ```text
//! coeff·x[f] <= threshold + M·(1 - l[t, leaf])      for every row
//! Σ_leaf l[t, leaf] == 1
//! y[t] == Σ_leaf prediction[leaf] · l[t, leaf]
//! ```

use log::debug;
use ndarray::{Array1, Array2};

use crate::config::EncodingConfig;
use crate::milp::{Constraint, LinearExpr, MilpModel, ModelError, Scope, VarKey};
use crate::paths::{leaf_paths, Direction, LeafPath};
use crate::repr::TreeNode;

/// Error type for compiling one tree.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error("split on feature {feature} but the model has {n_features} features")]
    FeatureOutOfRange { feature: usize, n_features: usize },
    #[error("split on feature {feature} has non-finite threshold {threshold}")]
    NonFiniteThreshold { feature: usize, threshold: f64 },
}

/// Row coefficient for an edge: `+1` for `<=`, `-1` for `>`.
#[inline]
fn row_coefficient(direction: Direction) -> f64 {
    -direction.sign()
}

/// Constraint table of one tree.
#[derive(Debug, Clone)]
pub struct TreeConstraints {
    row_leaf: Vec<usize>,
    features: Array2<f64>,
    thresholds: Array1<f64>,
    predictions: Array1<f64>,
}

impl TreeConstraints {
    /// Compile a tree directly.
    pub fn from_tree(
        tree: &TreeNode,
        n_features: usize,
        config: &EncodingConfig,
    ) -> Result<Self, CompileError> {
        Self::compile(&leaf_paths(tree), n_features, config)
    }

    /// Compile the leaf paths of one tree.
    ///
    /// Leaf ids are the positions of the paths in `paths`.
    pub fn compile(
        paths: &[LeafPath],
        n_features: usize,
        config: &EncodingConfig,
    ) -> Result<Self, CompileError> {
        let n_rows: usize = paths.iter().map(LeafPath::len).sum();

        let mut row_leaf = Vec::with_capacity(n_rows);
        let mut features = Array2::<f64>::zeros((n_rows, n_features));
        let mut thresholds = Array1::<f64>::zeros(n_rows);

        let mut row = 0;
        for (leaf, path) in paths.iter().enumerate() {
            for (feature, threshold, direction) in path.splits() {
                if feature >= n_features {
                    return Err(CompileError::FeatureOutOfRange {
                        feature,
                        n_features,
                    });
                }
                if !threshold.is_finite() {
                    return Err(CompileError::NonFiniteThreshold { feature, threshold });
                }
                let coeff = row_coefficient(direction);
                features[[row, feature]] = coeff;
                thresholds[row] = if coeff < 0.0 {
                    -threshold + config.epsilon
                } else {
                    threshold
                };
                row_leaf.push(leaf);
                row += 1;
            }
        }

        let predictions = paths.iter().map(|p| p.value).collect::<Array1<f64>>();

        Ok(Self {
            row_leaf,
            features,
            thresholds,
            predictions,
        })
    }

    /// Number of leaves (selector variables).
    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.predictions.len()
    }

    /// Number of (leaf, split edge) rows.
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.row_leaf.len()
    }

    /// Number of feature columns.
    #[inline]
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Owning leaf of every row.
    pub fn row_leaf(&self) -> &[usize] {
        &self.row_leaf
    }

    /// Signed one-hot coefficients, `rows × n_features`.
    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// Adjusted right-hand side of every row.
    pub fn thresholds(&self) -> &Array1<f64> {
        &self.thresholds
    }

    /// Output of every leaf, indexed by leaf id.
    pub fn predictions(&self) -> &Array1<f64> {
        &self.predictions
    }

    /// Combined table: leaf id in column 0, coefficients after it.
    pub fn leaf_and_features(&self) -> Array2<f64> {
        let mut table = Array2::<f64>::zeros((self.n_rows(), self.n_features() + 1));
        for (r, &leaf) in self.row_leaf.iter().enumerate() {
            table[[r, 0]] = leaf as f64;
            for (f, &coeff) in self.features.row(r).indexed_iter() {
                table[[r, f + 1]] = coeff;
            }
        }
        table
    }

    /// Whether `x` satisfies every row of `leaf`.
    pub fn leaf_contains(&self, leaf: usize, x: &[f64]) -> bool {
        self.row_leaf
            .iter()
            .enumerate()
            .filter(|&(_, &l)| l == leaf)
            .all(|(r, _)| {
                let lhs: f64 = self.features.row(r).iter().zip(x).map(|(c, v)| c * v).sum();
                lhs <= self.thresholds[r]
            })
    }

    /// Register this tree's selectors, output and constraints in `model`.
    ///
    /// Adds the components `tree_{id}_leaf_bounds`, `tree_{id}_one_leaf` and
    /// `tree_{id}_output`. Every family uses the selectors
    /// `VarKey::Selector { tree: tree_id, .. }`.
    ///
    /// # Errors
    ///
    /// [`ModelError::DuplicateComponent`] if this tree id was embedded before.
    pub fn embed(
        &self,
        model: &mut MilpModel,
        tree_id: usize,
        config: &EncodingConfig,
    ) -> Result<(), ModelError> {
        let big_m = config.big_m;
        let selectors: Vec<_> = (0..self.n_leaves())
            .map(|leaf| model.var(VarKey::Selector { tree: tree_id, leaf }))
            .collect();
        let x: Vec<_> = (0..self.n_features())
            .map(|f| model.var(VarKey::Feature(f)))
            .collect();
        let y = model.var(VarKey::Output(Scope::Tree(tree_id)));

        // coeff·x + M·l <= threshold + M
        let leaf_bounds = self
            .row_leaf
            .iter()
            .enumerate()
            .map(|(r, &leaf)| {
                let mut expr = LinearExpr::from_var(selectors[leaf], big_m);
                for (f, &coeff) in self.features.row(r).indexed_iter() {
                    if coeff != 0.0 {
                        expr.add_term(x[f], coeff);
                    }
                }
                Constraint::le(expr, self.thresholds[r] + big_m)
            })
            .collect();
        model.add_component(format!("tree_{tree_id}_leaf_bounds"), leaf_bounds)?;

        let one_leaf = selectors
            .iter()
            .fold(LinearExpr::zero(), |expr, &l| expr.with_term(l, 1.0));
        model.add_constraint(format!("tree_{tree_id}_one_leaf"), Constraint::eq(one_leaf, 1.0))?;

        let output = selectors
            .iter()
            .zip(self.predictions.iter())
            .fold(LinearExpr::from_var(y, 1.0), |expr, (&l, &p)| expr.with_term(l, -p));
        model.add_constraint(format!("tree_{tree_id}_output"), Constraint::eq(output, 0.0))?;

        debug!(
            "embedded tree {tree_id}: {} leaves, {} bound rows",
            self.n_leaves(),
            self.n_rows()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    fn stump() -> TreeNode {
        TreeNode::split(0, 0.5, TreeNode::leaf(-1.0), TreeNode::leaf(1.0))
    }

    fn depth_two() -> TreeNode {
        // x1 <= 2 ? (x0 <= 0 ? 1 : 2) : 3
        TreeNode::split(
            1,
            2.0,
            TreeNode::split(0, 0.0, TreeNode::leaf(1.0), TreeNode::leaf(2.0)),
            TreeNode::leaf(3.0),
        )
    }

    #[test]
    fn compiles_stump_table() {
        let tc = TreeConstraints::from_tree(&stump(), 2, &EncodingConfig::default()).unwrap();

        assert_eq!(tc.n_leaves(), 2);
        assert_eq!(tc.n_rows(), 2);
        assert_eq!(tc.row_leaf(), &[0, 1]);
        assert_eq!(tc.features().row(0).to_vec(), vec![1.0, 0.0]);
        assert_eq!(tc.features().row(1).to_vec(), vec![-1.0, 0.0]);
        assert_eq!(tc.thresholds()[0], 0.5);
        assert_abs_diff_eq!(tc.thresholds()[1], -0.5 + 1e-6, epsilon = 1e-15);
        assert_eq!(tc.predictions().to_vec(), vec![-1.0, 1.0]);

        let table = tc.leaf_and_features();
        assert_eq!(table.dim(), (2, 3));
        assert_eq!(table.row(1).to_vec(), vec![1.0, -1.0, 0.0]);
    }

    #[rstest]
    #[case(1.0, 1.0)]
    #[case(-2.5, -2.5)]
    #[case(0.0, 0.0)]
    fn left_rows_keep_threshold(#[case] theta: f64, #[case] expected: f64) {
        let tree = TreeNode::split(0, theta, TreeNode::leaf(0.0), TreeNode::leaf(1.0));
        let tc = TreeConstraints::from_tree(&tree, 1, &EncodingConfig::default()).unwrap();
        assert_eq!(tc.thresholds()[0], expected);
    }

    #[rstest]
    #[case(1.0)]
    #[case(-2.5)]
    #[case(1e3)]
    fn right_rows_negate_and_add_epsilon(#[case] theta: f64) {
        let tree = TreeNode::split(0, theta, TreeNode::leaf(0.0), TreeNode::leaf(1.0));
        let tc = TreeConstraints::from_tree(&tree, 1, &EncodingConfig::default()).unwrap();
        assert_eq!(tc.features()[[1, 0]], -1.0);
        assert_abs_diff_eq!(tc.thresholds()[1], -theta + 1e-6, epsilon = 1e-12);
    }

    #[test]
    fn epsilon_comes_from_config() {
        let config = EncodingConfig::builder().epsilon(0.25).build().unwrap();
        let tc = TreeConstraints::from_tree(&stump(), 1, &config).unwrap();
        assert_eq!(tc.thresholds()[1], -0.25);
    }

    #[test]
    fn single_leaf_tree_has_no_rows() {
        let tc = TreeConstraints::from_tree(&TreeNode::leaf(4.2), 3, &EncodingConfig::default())
            .unwrap();
        assert_eq!(tc.n_leaves(), 1);
        assert_eq!(tc.n_rows(), 0);
        assert_eq!(tc.features().dim(), (0, 3));
        assert_eq!(tc.predictions().to_vec(), vec![4.2]);
        assert!(tc.leaf_contains(0, &[9.0, 9.0, 9.0]));
    }

    #[test]
    fn feature_out_of_range() {
        let err = TreeConstraints::from_tree(&depth_two(), 1, &EncodingConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::FeatureOutOfRange {
                feature: 1,
                n_features: 1
            }
        );
    }

    #[test]
    fn infinite_threshold_is_rejected() {
        let tree = TreeNode::split(0, f64::INFINITY, TreeNode::leaf(0.0), TreeNode::leaf(1.0));
        let err = TreeConstraints::from_tree(&tree, 1, &EncodingConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::NonFiniteThreshold { feature: 0, .. }));
    }

    #[test]
    fn leaf_regions_match_prediction() {
        let tree = depth_two();
        let tc = TreeConstraints::from_tree(&tree, 2, &EncodingConfig::default()).unwrap();
        for x in [[-1.0, 0.0], [0.5, 1.5], [0.0, 3.0], [7.0, -7.0]] {
            let selected: Vec<usize> = (0..tc.n_leaves())
                .filter(|&l| tc.leaf_contains(l, &x))
                .collect();
            assert_eq!(selected.len(), 1, "x = {:?}", x);
            assert_eq!(tc.predictions()[selected[0]], tree.predict_row(&x));
        }
    }

    #[test]
    fn embed_registers_three_families() {
        let config = EncodingConfig::default();
        let tc = TreeConstraints::from_tree(&depth_two(), 2, &config).unwrap();
        let mut model = MilpModel::default();
        tc.embed(&mut model, 4, &config).unwrap();

        assert_eq!(model.component("tree_4_leaf_bounds").unwrap().len(), tc.n_rows());

        let one_leaf = &model.component("tree_4_one_leaf").unwrap()[0];
        assert_eq!(one_leaf.expr.n_terms(), 3);
        assert_eq!(one_leaf.rhs, 1.0);
        for leaf in 0..3 {
            let l = model.get(VarKey::Selector { tree: 4, leaf }).unwrap();
            assert_eq!(one_leaf.expr.coeff(l), 1.0);
        }

        let output = &model.component("tree_4_output").unwrap()[0];
        let l2 = model.get(VarKey::Selector { tree: 4, leaf: 2 }).unwrap();
        assert_eq!(output.expr.coeff(l2), -3.0);

        let selectors = model
            .variables()
            .iter()
            .filter(|v| matches!(v.key, VarKey::Selector { .. }))
            .count();
        assert_eq!(selectors, 3);
    }

    #[test]
    fn embed_twice_fails() {
        let config = EncodingConfig::default();
        let tc = TreeConstraints::from_tree(&stump(), 1, &config).unwrap();
        let mut model = MilpModel::default();
        tc.embed(&mut model, 0, &config).unwrap();
        let err = tc.embed(&mut model, 0, &config).unwrap_err();
        assert_eq!(err, ModelError::DuplicateComponent("tree_0_leaf_bounds".to_string()));
        // A different tree id is fine.
        tc.embed(&mut model, 1, &config).unwrap();
    }

    fn assignment(x0: f64, left: f64, y: f64) -> HashMap<VarKey, f64> {
        HashMap::from([
            (VarKey::Feature(0), x0),
            (VarKey::Selector { tree: 0, leaf: 0 }, left),
            (VarKey::Selector { tree: 0, leaf: 1 }, 1.0 - left),
            (VarKey::Output(Scope::Tree(0)), y),
        ])
    }

    #[test]
    fn big_m_rows_force_the_matching_leaf() {
        let config = EncodingConfig::default();
        let tc = TreeConstraints::from_tree(&stump(), 1, &config).unwrap();
        let mut model = MilpModel::default();
        tc.embed(&mut model, 0, &config).unwrap();

        // Left region
        assert!(model.is_feasible(&assignment(0.2, 1.0, -1.0), 1e-9).unwrap());
        assert!(!model.is_feasible(&assignment(0.2, 0.0, 1.0), 1e-9).unwrap());
        // Right region
        assert!(model.is_feasible(&assignment(0.8, 0.0, 1.0), 1e-9).unwrap());
        assert!(!model.is_feasible(&assignment(0.8, 1.0, -1.0), 1e-9).unwrap());
        // Output must match the selected leaf
        assert!(!model.is_feasible(&assignment(0.2, 1.0, 1.0), 1e-9).unwrap());
        // Threshold itself belongs to the left leaf
        assert!(model.is_feasible(&assignment(0.5, 1.0, -1.0), 1e-9).unwrap());
    }

    #[rstest]
    #[case(0.5)]
    #[case(0.5 - 0.5e-6)]
    fn epsilon_band_admits_both_leaves(#[case] x: f64) {
        let config = EncodingConfig::default();
        let tc = TreeConstraints::from_tree(&stump(), 1, &config).unwrap();
        assert!(tc.leaf_contains(0, &[x]));
        assert!(tc.leaf_contains(1, &[x]));

        let mut model = MilpModel::default();
        tc.embed(&mut model, 0, &config).unwrap();
        assert!(model.is_feasible(&assignment(x, 1.0, -1.0), 1e-9).unwrap());
        assert!(model.is_feasible(&assignment(x, 0.0, 1.0), 1e-9).unwrap());

        // Outside the band only one leaf is left
        assert!(!tc.leaf_contains(1, &[0.5 - 2e-6]));
    }
}

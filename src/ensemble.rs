//! Ensemble assembler.
//!
//! [`Treemax`] owns a [`TreeEnsemble`], the compiled constraints of every tree
//! and the [`MilpModel`] they are embedded into. The ensemble prediction is
//! tied to the per-tree outputs by
//!
//! ```text
//! y[ens] == init_score + learning_rate · Σ_t y[t]
//! ```
//!
//! where `init_score` is the (weighted) mean of the training targets.
//!
//! # Example
//!
//! ```
//! use ndarray::array;
//! use treemax::config::EncodingConfig;
//! use treemax::ensemble::Treemax;
//! use treemax::repr::{TreeEnsemble, TreeNode};
//!
//! let mut ensemble = TreeEnsemble::with_n_features(1, 1.0);
//! ensemble.push_tree(TreeNode::split(0, 0.5, TreeNode::leaf(-1.0), TreeNode::leaf(1.0)));
//!
//! let x = array![[0.1], [0.9]];
//! let y = array![0.0, 2.0];
//! let mut treemax =
//!     Treemax::build(ensemble, x.view(), y.view(), None, EncodingConfig::default()).unwrap();
//! assert_eq!(treemax.init_score(), 1.0);
//!
//! treemax.embed(1.0).unwrap();
//! assert!(treemax.is_embedded());
//! ```

use log::{debug, info};
use ndarray::{ArrayView1, ArrayView2};

use crate::config::EncodingConfig;
use crate::constraints::{CompileError, TreeConstraints};
use crate::milp::{
    Constraint, LinearExpr, MilpModel, ModelError, Scope, Solution, SolveError, VarKey,
};
use crate::paths::{leaf_paths, LeafPath};
use crate::repr::TreeEnsemble;

/// Error type for building, embedding and optimizing a [`Treemax`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EmbedError {
    #[error("failed to compile tree {tree}: {source}")]
    Compile {
        tree: usize,
        #[source]
        source: CompileError,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid sample weights: {0}")]
    InvalidWeights(String),
    #[error("ensemble has not been embedded")]
    NotEmbedded,
}

/// Weighted mean of the targets, `Σ y·w / Σ w`.
fn weighted_mean(y: ArrayView1<f64>, weights: Option<ArrayView1<f64>>) -> Result<f64, EmbedError> {
    match weights {
        None => y
            .mean()
            .ok_or_else(|| EmbedError::InvalidWeights("no training targets".to_string())),
        Some(w) => {
            if w.len() != y.len() {
                return Err(EmbedError::DimensionMismatch {
                    what: "sample weights",
                    expected: y.len(),
                    actual: w.len(),
                });
            }
            let total = w.sum();
            if !total.is_finite() || total == 0.0 {
                return Err(EmbedError::InvalidWeights(format!(
                    "weights must sum to a finite nonzero value, got {total}"
                )));
            }
            Ok(y.dot(&w) / total)
        }
    }
}

/// A tree ensemble together with its MILP encoding.
#[derive(Debug, Clone)]
pub struct Treemax {
    ensemble: TreeEnsemble,
    config: EncodingConfig,
    paths: Vec<Vec<LeafPath>>,
    tree_constraints: Vec<TreeConstraints>,
    init_score: f64,
    model: MilpModel,
    solution: Option<Solution>,
    is_embedded: bool,
    is_optimized: bool,
}

impl Treemax {
    /// Compile every tree of `ensemble` and set up an empty model.
    ///
    /// `x` and `y` are the training data; only `y` (and the optional
    /// `sample_weights`) feed the base score, `x` is used to check the
    /// feature count.
    ///
    /// # Errors
    ///
    /// - [`EmbedError::DimensionMismatch`] if `x`, `y` or the weights disagree
    ///   with each other or with the ensemble's feature count
    /// - [`EmbedError::InvalidWeights`] if there are no targets or the
    ///   weights sum to zero
    /// - [`EmbedError::Compile`] if a tree references an unknown feature
    pub fn build(
        ensemble: TreeEnsemble,
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        sample_weights: Option<ArrayView1<f64>>,
        config: EncodingConfig,
    ) -> Result<Self, EmbedError> {
        let n_features = ensemble.n_features();
        if x.ncols() != n_features {
            return Err(EmbedError::DimensionMismatch {
                what: "feature columns",
                expected: n_features,
                actual: x.ncols(),
            });
        }
        if y.len() != x.nrows() {
            return Err(EmbedError::DimensionMismatch {
                what: "training targets",
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        let init_score = weighted_mean(y, sample_weights)?;

        let paths: Vec<Vec<LeafPath>> = ensemble.trees().map(leaf_paths).collect();
        let tree_constraints = paths
            .iter()
            .enumerate()
            .map(|(tree, p)| {
                TreeConstraints::compile(p, n_features, &config)
                    .map_err(|source| EmbedError::Compile { tree, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut model = MilpModel::new(config.sense);
        for (i, name) in ensemble.feature_names().iter().enumerate() {
            model.declare(VarKey::Feature(i), name.as_str());
        }

        debug!(
            "compiled {} trees over {n_features} features, init score {init_score}",
            ensemble.n_trees()
        );

        Ok(Self {
            ensemble,
            config,
            paths,
            tree_constraints,
            init_score,
            model,
            solution: None,
            is_embedded: false,
            is_optimized: false,
        })
    }

    /// Add every tree and the ensemble output row to the model.
    ///
    /// When `weight_objective` is nonzero, `weight_objective · y[ens]` is
    /// added to the objective.
    ///
    /// # Errors
    ///
    /// [`EmbedError::Model`] with [`ModelError::DuplicateComponent`] when
    /// called a second time.
    pub fn embed(&mut self, weight_objective: f64) -> Result<(), EmbedError> {
        for (tree_id, tc) in self.tree_constraints.iter().enumerate() {
            tc.embed(&mut self.model, tree_id, &self.config)?;
        }

        // y[ens] - lr·Σ y[t] == init_score
        let lr = self.ensemble.learning_rate();
        let y_ens = self.model.var(VarKey::Output(Scope::Ensemble));
        let mut expr = LinearExpr::from_var(y_ens, 1.0);
        for tree_id in 0..self.n_trees() {
            let y_t = self.model.var(VarKey::Output(Scope::Tree(tree_id)));
            expr.add_term(y_t, -lr);
        }
        self.model
            .add_constraint("ensemble_output", Constraint::eq(expr, self.init_score))?;

        if weight_objective != 0.0 {
            self.model
                .add_objective_term(VarKey::Output(Scope::Ensemble), weight_objective);
        }

        self.is_embedded = true;
        info!(
            "embedded {} trees: {} variables, {} constraints",
            self.n_trees(),
            self.model.n_vars(),
            self.model.n_constraints()
        );
        Ok(())
    }

    /// Solve the embedded model.
    ///
    /// # Errors
    ///
    /// [`EmbedError::NotEmbedded`] before [`embed`](Self::embed), or the
    /// solver failure.
    pub fn optimize(&mut self) -> Result<&Solution, EmbedError> {
        if !self.is_embedded {
            return Err(EmbedError::NotEmbedded);
        }
        let solution = self.model.solve()?;
        self.is_optimized = true;
        Ok(self.solution.insert(solution))
    }

    /// Ensemble prediction for one row, base score included.
    ///
    /// # Panics
    ///
    /// Panics if `features` is shorter than the ensemble's feature count.
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.init_score + self.ensemble.predict_row_raw(features)
    }

    /// Feature values of the last solution, in feature order.
    ///
    /// Right-branch rows admit `x >= θ - epsilon`, so a solved input may sit in
    /// the band `[θ - epsilon, θ]` of a split while the model uses the right
    /// leaf. The solution objective can then differ from
    /// [`predict_row`](Self::predict_row) at these features by one band
    /// crossing per split. An optimizer pushes inputs to such boundaries
    /// whenever the right leaf scores better.
    pub fn optimal_features(&self) -> Option<Vec<f64>> {
        let solution = self.solution.as_ref()?;
        (0..self.ensemble.n_features())
            .map(|i| solution.value(VarKey::Feature(i)))
            .collect()
    }

    // --- accessors ---

    pub fn model(&self) -> &MilpModel {
        &self.model
    }

    /// Mutable model, for side constraints and input bounds.
    pub fn model_mut(&mut self) -> &mut MilpModel {
        &mut self.model
    }

    pub fn into_model(self) -> MilpModel {
        self.model
    }

    pub fn ensemble(&self) -> &TreeEnsemble {
        &self.ensemble
    }

    pub fn config(&self) -> &EncodingConfig {
        &self.config
    }

    /// Weighted mean of the training targets.
    #[inline]
    pub fn init_score(&self) -> f64 {
        self.init_score
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.tree_constraints.len()
    }

    /// Leaf paths of one tree.
    pub fn paths(&self, tree: usize) -> &[LeafPath] {
        &self.paths[tree]
    }

    pub fn tree_constraints(&self) -> &[TreeConstraints] {
        &self.tree_constraints
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    #[inline]
    pub fn is_embedded(&self) -> bool {
        self.is_embedded
    }

    #[inline]
    pub fn is_optimized(&self) -> bool {
        self.is_optimized
    }
}

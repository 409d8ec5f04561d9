//! Conversion from LightGBM dump types to native treemax types.

use crate::repr::{TreeEnsemble, TreeNode};

use super::json::{LgbDump, LgbNode, LgbThreshold};

/// Objective prefixes of single-output regression boosters.
const REGRESSION_OBJECTIVES: &[&str] = &[
    "regression",
    "huber",
    "fair",
    "poisson",
    "quantile",
    "mape",
    "gamma",
    "tweedie",
];

/// Error type for LightGBM dump conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("expected a single-output regression tree booster, found {0}")]
    TypeMismatch(String),
    #[error("tree {tree}: unsupported split `{decision_type}`, only numeric `<=` splits can be embedded")]
    UnsupportedSplit { tree: usize, decision_type: String },
    #[error("tree {tree}: {message}")]
    MalformedTree { tree: usize, message: String },
    #[error("expected {expected} feature names, got {actual}")]
    FeatureNameMismatch { expected: usize, actual: usize },
    #[error("learning_rate must be finite and positive, got {0}")]
    InvalidLearningRate(f64),
}

impl LgbDump {
    /// Convert to a native [`TreeEnsemble`].
    ///
    /// The dump does not record the wrapper's learning rate, so the caller
    /// supplies it.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let dump = LgbDump::from_file("model.json")?;
    /// let ensemble = dump.to_ensemble(0.1)?;
    /// ```
    pub fn to_ensemble(&self, learning_rate: f64) -> Result<TreeEnsemble, ConversionError> {
        self.check_regression()?;

        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ConversionError::InvalidLearningRate(learning_rate));
        }

        let n_features = self.num_features();
        let feature_names = if self.feature_names.is_empty() {
            (0..n_features).map(|i| format!("Column_{i}")).collect()
        } else if self.feature_names.len() == n_features {
            self.feature_names.clone()
        } else {
            return Err(ConversionError::FeatureNameMismatch {
                expected: n_features,
                actual: self.feature_names.len(),
            });
        };

        let mut ensemble = TreeEnsemble::new(feature_names, learning_rate);
        if let Some(objective) = &self.objective {
            ensemble = ensemble.with_objective(objective.clone());
        }

        for (tree_idx, info) in self.tree_info.iter().enumerate() {
            if info.num_cat > 0 {
                return Err(ConversionError::UnsupportedSplit {
                    tree: tree_idx,
                    decision_type: format!("{} categorical splits", info.num_cat),
                });
            }
            if let Some(declared) = info.num_leaves {
                let actual = info.tree_structure.n_leaves();
                if declared != actual {
                    return Err(ConversionError::MalformedTree {
                        tree: tree_idx,
                        message: format!("declares {declared} leaves but has {actual}"),
                    });
                }
            }
            ensemble.push_tree(convert_node(&info.tree_structure, tree_idx)?);
        }

        Ok(ensemble)
    }

    /// Reject anything that is not a single-output regression tree booster.
    fn check_regression(&self) -> Result<(), ConversionError> {
        if self.name != "tree" {
            return Err(ConversionError::TypeMismatch(format!("model kind `{}`", self.name)));
        }
        if self.num_class != 1 || self.num_tree_per_iteration != 1 {
            return Err(ConversionError::TypeMismatch(format!(
                "{} classes with {} trees per iteration",
                self.num_class, self.num_tree_per_iteration
            )));
        }
        if let Some(objective) = &self.objective {
            let name = objective.split_whitespace().next().unwrap_or("");
            if !REGRESSION_OBJECTIVES.iter().any(|p| name.starts_with(p)) {
                return Err(ConversionError::TypeMismatch(format!("objective `{objective}`")));
            }
        }
        Ok(())
    }
}

/// Convert one dumped subtree to a [`TreeNode`].
fn convert_node(node: &LgbNode, tree_idx: usize) -> Result<TreeNode, ConversionError> {
    match node {
        LgbNode::Leaf(leaf) => Ok(TreeNode::leaf(leaf.leaf_value)),
        LgbNode::Split(split) => {
            let threshold = match &split.threshold {
                LgbThreshold::Numeric(t) if split.decision_type == "<=" => *t,
                _ => {
                    return Err(ConversionError::UnsupportedSplit {
                        tree: tree_idx,
                        decision_type: split.decision_type.clone(),
                    })
                }
            };
            if threshold.is_nan() {
                return Err(ConversionError::MalformedTree {
                    tree: tree_idx,
                    message: format!("NaN threshold on feature {}", split.split_feature),
                });
            }
            Ok(TreeNode::split(
                split.split_feature,
                threshold,
                convert_node(&split.left_child, tree_idx)?,
                convert_node(&split.right_child, tree_idx)?,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(objective: &str, tree: &str) -> LgbDump {
        LgbDump::from_json_str(&format!(
            r#"{{"name": "tree", "num_class": 1, "max_feature_idx": 1,
                "objective": "{objective}", "feature_names": ["a", "b"],
                "tree_info": [{{"tree_index": 0, "tree_structure": {tree}}}]}}"#
        ))
        .unwrap()
    }

    const STUMP: &str = r#"{"split_feature": 1, "threshold": 0.5, "decision_type": "<=",
        "left_child": {"leaf_value": -1}, "right_child": {"leaf_value": 1}}"#;

    #[test]
    fn convert_stump() {
        let ensemble = dump("regression", STUMP).to_ensemble(0.1).unwrap();

        assert_eq!(ensemble.n_trees(), 1);
        assert_eq!(ensemble.n_features(), 2);
        assert_eq!(ensemble.feature_names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ensemble.learning_rate(), 0.1);
        assert_eq!(
            ensemble.tree(0),
            &TreeNode::split(1, 0.5, TreeNode::leaf(-1.0), TreeNode::leaf(1.0))
        );
    }

    #[test]
    fn objective_with_parameters_is_accepted() {
        assert!(dump("huber alpha:0.9", STUMP).to_ensemble(1.0).is_ok());
        assert!(dump("quantile alpha:0.5", STUMP).to_ensemble(1.0).is_ok());
    }

    #[test]
    fn classifier_is_type_mismatch() {
        let err = dump("binary sigmoid:1", STUMP).to_ensemble(1.0).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch(_)));

        let mut multi = dump("multiclass num_class:3", STUMP);
        multi.num_class = 3;
        let err = multi.to_ensemble(1.0).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch(_)));
    }

    #[test]
    fn categorical_split_is_unsupported() {
        let tree = r#"{"split_feature": 0, "threshold": "1||2", "decision_type": "==",
            "left_child": {"leaf_value": 1}, "right_child": {"leaf_value": 2}}"#;
        let err = dump("regression", tree).to_ensemble(1.0).unwrap_err();
        assert!(matches!(err, ConversionError::UnsupportedSplit { tree: 0, .. }));
    }

    #[test]
    fn declared_categorical_splits_are_unsupported() {
        // Numeric-looking tree, but the header counts a categorical split.
        let mut d = dump("regression", STUMP);
        d.tree_info[0].num_cat = 1;
        let err = d.to_ensemble(1.0).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::UnsupportedSplit { tree: 0, ref decision_type }
                if decision_type == "1 categorical splits"
        ));
    }

    #[test]
    fn declared_leaf_count_must_match() {
        let mut d = dump("regression", STUMP);
        d.tree_info[0].num_leaves = Some(3);
        let err = d.to_ensemble(1.0).unwrap_err();
        assert!(matches!(err, ConversionError::MalformedTree { tree: 0, .. }));
    }

    #[test]
    fn rejects_bad_learning_rate() {
        let err = dump("regression", STUMP).to_ensemble(0.0).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidLearningRate(_)));
    }

    #[test]
    fn generates_feature_names_when_absent() {
        let mut d = dump("regression", STUMP);
        d.feature_names.clear();
        let ensemble = d.to_ensemble(1.0).unwrap();
        assert_eq!(ensemble.feature_names()[1], "Column_1");

        d.feature_names = vec!["only".to_string()];
        let err = d.to_ensemble(1.0).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::FeatureNameMismatch { expected: 2, actual: 1 }
        ));
    }
}

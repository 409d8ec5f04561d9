//! LightGBM JSON dump parser.
//!
//! Parses the document returned by LightGBM's `Booster.dump_model()`. These are
//! "foreign types" used only for parsing; [`LgbDump::to_ensemble`] converts them
//! to the native [`TreeEnsemble`](crate::repr::TreeEnsemble).

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

// =============================================================================
// Error types
// =============================================================================

/// Error type for LightGBM dump parsing.
///
/// A tree node missing the keys of both node shapes ends up in
/// [`ParseError::Json`], which is how malformed trees surface at load time.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed model dump: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Default value helpers for serde
// =============================================================================

fn default_name() -> String {
    "tree".to_string()
}
fn default_num_class() -> usize {
    1
}
fn default_decision_type() -> String {
    "<=".to_string()
}

// =============================================================================
// Tree structure
// =============================================================================

/// Split threshold as dumped: a number for numeric splits, a `||`-joined
/// category list for categorical ones.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LgbThreshold {
    Numeric(f64),
    Categorical(String),
}

/// An internal node of a dumped tree.
#[derive(Debug, Clone, Deserialize)]
pub struct LgbSplit {
    pub split_feature: usize,
    pub threshold: LgbThreshold,
    #[serde(default = "default_decision_type")]
    pub decision_type: String,
    pub left_child: Box<LgbNode>,
    pub right_child: Box<LgbNode>,
}

/// A leaf of a dumped tree.
#[derive(Debug, Clone, Deserialize)]
pub struct LgbLeaf {
    pub leaf_value: f64,
}

/// A dumped tree node, discriminated by the keys present.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LgbNode {
    Split(LgbSplit),
    Leaf(LgbLeaf),
}

impl LgbNode {
    /// Number of leaves in the subtree.
    pub fn n_leaves(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                LgbNode::Leaf(_) => count += 1,
                LgbNode::Split(split) => {
                    stack.push(&split.right_child);
                    stack.push(&split.left_child);
                }
            }
        }
        count
    }
}

/// Per-tree entry of `tree_info`.
#[derive(Debug, Clone, Deserialize)]
pub struct LgbTreeInfo {
    #[serde(default)]
    pub tree_index: usize,
    #[serde(default)]
    pub num_leaves: Option<usize>,
    /// Number of categorical splits in the tree.
    #[serde(default)]
    pub num_cat: usize,
    pub tree_structure: LgbNode,
}

// =============================================================================
// Full dump
// =============================================================================

/// A parsed `dump_model()` document.
#[derive(Debug, Clone, Deserialize)]
pub struct LgbDump {
    /// Model kind; `"tree"` for gradient-boosted trees.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default = "default_num_class")]
    pub num_class: usize,
    #[serde(default = "default_num_class")]
    pub num_tree_per_iteration: usize,
    /// Maximum feature index used (0-based).
    pub max_feature_idx: usize,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub tree_info: Vec<LgbTreeInfo>,
}

impl LgbDump {
    /// Load a dump from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ParseError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a dump from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self, ParseError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a dump from any reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, ParseError> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Number of trees in the dump.
    pub fn num_trees(&self) -> usize {
        self.tree_info.len()
    }

    /// Number of features.
    pub fn num_features(&self) -> usize {
        self.max_feature_idx + 1
    }
}

// =============================================================================
// Tests
// =============================================================================

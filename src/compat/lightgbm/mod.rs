//! LightGBM model dump support.
//!
//! This module parses the JSON document produced by LightGBM's
//! `Booster.dump_model()` and converts it to a native
//! [`TreeEnsemble`](crate::repr::TreeEnsemble).
//!
//! # Format Overview
//!
//! The dump has a header (model kind, objective, feature names) and a
//! `tree_info` array. Each tree is a nested `tree_structure` where internal
//! nodes carry `split_feature`, `threshold`, `decision_type`, `left_child` and
//! `right_child`, and leaves carry `leaf_value`.
//!
//! - Split condition uses `<=`: a row goes left if `value <= threshold`
//! - Categorical splits (`==` with `||`-joined thresholds) cannot be embedded
//!
//! # Example
//!
//! ```ignore
//! use treemax::compat::lightgbm::LgbDump;
//!
//! let dump = LgbDump::from_file("model.json")?;
//! let ensemble = dump.to_ensemble(0.1)?;
//! ```

mod convert;
mod json;

pub use convert::ConversionError;
pub use json::*;

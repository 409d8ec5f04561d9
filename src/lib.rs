//! treemax: embed gradient-boosted tree ensembles in mixed-integer programs.
//!
//! A trained regression ensemble is a piecewise-constant function of its
//! inputs. This crate compiles every tree into big-M constraints with one
//! binary selector per leaf and links the per-tree outputs into one
//! ensemble prediction variable, so a MILP solver can search the input space
//! against the exact model.
//!
//! - [`compat::lightgbm`]: load LightGBM `dump_model()` JSON
//! - [`paths`]: root-to-leaf paths of a tree
//! - [`constraints`]: per-tree constraint tables and their big-M rows
//! - [`ensemble`]: [`Treemax`], the assembled model
//! - [`milp`]: the model container, LP export and the bundled solver

pub mod compat;
pub mod config;
pub mod constraints;
pub mod ensemble;
pub mod milp;
pub mod paths;
pub mod repr;

pub use config::{ConfigError, EncodingConfig};
pub use constraints::{CompileError, TreeConstraints};
pub use ensemble::{EmbedError, Treemax};
pub use milp::{MilpModel, ObjectiveSense, Solution, VarKey};
pub use paths::{leaf_paths, Direction, LeafPath};
pub use repr::{TreeEnsemble, TreeNode};

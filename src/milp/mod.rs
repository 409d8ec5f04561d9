//! Mixed-integer linear program container.
//!
//! This module provides:
//! - [`MilpModel`]: variables keyed by [`VarKey`], named constraint
//!   components and an additive objective
//! - [`LinearExpr`] / [`Constraint`]: rows of the program
//! - Feasibility checking of a full assignment ([`MilpModel::violations`])
//! - CPLEX LP export ([`MilpModel::write_lp`]) for external solvers
//! - Solving through `microlp` ([`MilpModel::solve`])
//!
//! # Variable keys
//!
//! Every variable is addressed by a structured [`VarKey`] instead of an ad hoc
//! string, and its domain follows from the key kind:
//!
//! | Key | Meaning | Domain |
//! |---|---|---|
//! | `Feature(i)` | input feature `x[i]` | reals |
//! | `Output(Tree(t))` | output of tree `t` | reals |
//! | `Output(Ensemble)` | ensemble prediction | reals |
//! | `Selector { tree, leaf }` | leaf `leaf` of tree `tree` is active | binary |
//! | `Violation(_)`, `SlackIndicator(_)` | reserved | binary |
//! | `Slack(_)` | reserved | non-negative reals |

mod expr;
mod lp_format;
mod model;
mod solve;

/// Index of a variable in its [`MilpModel`].
pub type VarId = usize;

pub use expr::{Constraint, ConstraintSense, LinearExpr};
pub use model::{
    Component, Domain, MilpModel, ModelError, Objective, ObjectiveSense, Scope, Variable,
    VarKey, Violation,
};
pub use solve::{Solution, SolveError};

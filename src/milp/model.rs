//! The shared optimization model.
//!
//! [`MilpModel`] owns every decision variable, keyed by a structured
//! [`VarKey`], and every constraint, grouped in named components. The tree
//! compiler and the ensemble assembler only ever append to it.

use std::collections::HashMap;
use std::fmt;

use log::trace;

use super::expr::{Constraint, LinearExpr};
use super::VarId;

// =============================================================================
// Error types
// =============================================================================

/// Error type for model construction and evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("constraint component `{0}` is already registered")]
    DuplicateComponent(String),
    #[error("no value assigned to variable {0}")]
    UnassignedVariable(String),
    #[error("invalid bounds for {var}: [{lower}, {upper}]")]
    InvalidBounds { var: String, lower: f64, upper: f64 },
}

// =============================================================================
// Variable keys and domains
// =============================================================================

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Reals,
    NonNegativeReals,
    Binary,
}

impl Domain {
    /// Natural bounds of the domain.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            Domain::Reals => (f64::NEG_INFINITY, f64::INFINITY),
            Domain::NonNegativeReals => (0.0, f64::INFINITY),
            Domain::Binary => (0.0, 1.0),
        }
    }

    /// Whether `value` lies in the domain up to `tol`.
    pub fn contains(&self, value: f64, tol: f64) -> bool {
        match self {
            Domain::Reals => value.is_finite(),
            Domain::NonNegativeReals => value >= -tol,
            Domain::Binary => value.abs() <= tol || (value - 1.0).abs() <= tol,
        }
    }
}

/// Owner of an output-like variable: one tree, or the whole ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Tree(usize),
    Ensemble,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Tree(t) => write!(f, "{t}"),
            Scope::Ensemble => write!(f, "ens"),
        }
    }
}

/// Structured name of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VarKey {
    /// Input feature `x[i]`.
    Feature(usize),
    /// Output `y` of one tree or of the ensemble.
    Output(Scope),
    /// Binary "leaf `leaf` of tree `tree` is active" selector.
    Selector { tree: usize, leaf: usize },
    /// Binary violation flag (reserved).
    Violation(Scope),
    /// Non-negative slack (reserved).
    Slack(Scope),
    /// Binary slack indicator (reserved).
    SlackIndicator(Scope),
}

impl VarKey {
    /// Domain every variable of this kind lives in.
    pub fn domain(&self) -> Domain {
        match self {
            VarKey::Feature(_) | VarKey::Output(_) => Domain::Reals,
            VarKey::Selector { .. } | VarKey::Violation(_) | VarKey::SlackIndicator(_) => {
                Domain::Binary
            }
            VarKey::Slack(_) => Domain::NonNegativeReals,
        }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarKey::Feature(i) => write!(f, "x[{i}]"),
            VarKey::Output(s) => write!(f, "y[{s}]"),
            VarKey::Selector { tree, leaf } => write!(f, "l[{tree},{leaf}]"),
            VarKey::Violation(s) => write!(f, "y_viol[{s}]"),
            VarKey::Slack(s) => write!(f, "v[{s}]"),
            VarKey::SlackIndicator(s) => write!(f, "v_ind[{s}]"),
        }
    }
}

/// A registered decision variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub key: VarKey,
    /// Human-readable label (feature name for inputs).
    pub label: String,
    pub domain: Domain,
    pub lower: f64,
    pub upper: f64,
}

// =============================================================================
// Objective
// =============================================================================

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ObjectiveSense {
    #[default]
    Maximize,
    Minimize,
}

/// Objective: a direction and an additive linear expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expr: LinearExpr,
}

// =============================================================================
// Components
// =============================================================================

/// A named group of constraint rows registered together.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

/// A constraint or domain that does not hold at an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Constraint { name: String, lhs: f64, rhs: f64 },
    Domain { var: String, value: f64 },
}

// =============================================================================
// MilpModel
// =============================================================================

/// Mixed-integer linear program under construction.
#[derive(Debug, Clone, Default)]
pub struct MilpModel {
    vars: Vec<Variable>,
    index: HashMap<VarKey, VarId>,
    components: Vec<Component>,
    component_index: HashMap<String, usize>,
    objective: Objective,
}

impl MilpModel {
    /// Create an empty model with a zero objective.
    pub fn new(sense: ObjectiveSense) -> Self {
        Self {
            objective: Objective {
                sense,
                expr: LinearExpr::zero(),
            },
            ..Default::default()
        }
    }

    // --- variables ---

    /// Id of the variable for `key`, creating it on first reference.
    pub fn var(&mut self, key: VarKey) -> VarId {
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        self.push_var(key, key.to_string())
    }

    /// Register the variable for `key` under a label, or relabel it.
    pub fn declare(&mut self, key: VarKey, label: impl Into<String>) -> VarId {
        let label = label.into();
        match self.index.get(&key) {
            Some(&id) => {
                self.vars[id].label = label;
                id
            }
            None => self.push_var(key, label),
        }
    }

    fn push_var(&mut self, key: VarKey, label: String) -> VarId {
        let domain = key.domain();
        let (lower, upper) = domain.bounds();
        let id = self.vars.len();
        self.vars.push(Variable {
            key,
            label,
            domain,
            lower,
            upper,
        });
        self.index.insert(key, id);
        id
    }

    /// Id of an existing variable.
    pub fn get(&self, key: VarKey) -> Option<VarId> {
        self.index.get(&key).copied()
    }

    /// Variable by id.
    #[inline]
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.vars[id]
    }

    /// All variables in registration order.
    pub fn variables(&self) -> &[Variable] {
        &self.vars
    }

    /// Number of variables.
    #[inline]
    pub fn n_vars(&self) -> usize {
        self.vars.len()
    }

    /// Restrict a variable to `[lower, upper]` (intersected with its domain).
    pub fn set_bounds(&mut self, key: VarKey, lower: f64, upper: f64) -> Result<VarId, ModelError> {
        if lower.is_nan() || upper.is_nan() {
            return Err(ModelError::InvalidBounds {
                var: key.to_string(),
                lower,
                upper,
            });
        }
        let (dom_lower, dom_upper) = key.domain().bounds();
        let (lower, upper) = (lower.max(dom_lower), upper.min(dom_upper));
        if lower > upper {
            return Err(ModelError::InvalidBounds {
                var: key.to_string(),
                lower,
                upper,
            });
        }
        let id = self.var(key);
        self.vars[id].lower = lower;
        self.vars[id].upper = upper;
        Ok(id)
    }

    /// Pin a variable to a single value.
    pub fn fix(&mut self, key: VarKey, value: f64) -> Result<VarId, ModelError> {
        self.set_bounds(key, value, value)
    }

    // --- constraints ---

    /// Register a named group of rows. Rows are named `name[i]`.
    ///
    /// # Errors
    ///
    /// [`ModelError::DuplicateComponent`] if `name` is already taken; the
    /// model is left untouched in that case.
    pub fn add_component(
        &mut self,
        name: impl Into<String>,
        constraints: Vec<Constraint>,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.component_index.contains_key(&name) {
            return Err(ModelError::DuplicateComponent(name));
        }
        let constraints = constraints
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.name = format!("{name}[{i}]");
                c
            })
            .collect::<Vec<_>>();
        trace!("registered component {name} with {} rows", constraints.len());
        self.component_index.insert(name.clone(), self.components.len());
        self.components.push(Component { name, constraints });
        Ok(())
    }

    /// Register a single named row.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        mut constraint: Constraint,
    ) -> Result<(), ModelError> {
        let name = name.into();
        if self.component_index.contains_key(&name) {
            return Err(ModelError::DuplicateComponent(name));
        }
        constraint.name = name.clone();
        trace!("registered constraint {name}");
        self.component_index.insert(name.clone(), self.components.len());
        self.components.push(Component {
            name,
            constraints: vec![constraint],
        });
        Ok(())
    }

    /// Rows of a component.
    pub fn component(&self, name: &str) -> Option<&[Constraint]> {
        self.component_index
            .get(name)
            .map(|&i| self.components[i].constraints.as_slice())
    }

    /// All components in registration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// All rows in registration order.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.components.iter().flat_map(|c| c.constraints.iter())
    }

    /// Total number of rows.
    pub fn n_constraints(&self) -> usize {
        self.components.iter().map(|c| c.constraints.len()).sum()
    }

    // --- objective ---

    /// The objective.
    #[inline]
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// Change the optimization direction.
    pub fn set_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.sense = sense;
    }

    /// Add `coeff·key` to the objective, keeping existing terms.
    pub fn add_objective_term(&mut self, key: VarKey, coeff: f64) {
        let id = self.var(key);
        self.objective.expr.add_term(id, coeff);
    }

    /// Add a whole expression to the objective.
    pub fn add_objective_expr(&mut self, expr: &LinearExpr) {
        self.objective.expr.add_expr(expr);
    }

    // --- evaluation ---

    /// Dense value vector from a key-value assignment.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnassignedVariable`] if a registered variable has no value.
    pub fn dense_values(&self, values: &HashMap<VarKey, f64>) -> Result<Vec<f64>, ModelError> {
        self.vars
            .iter()
            .map(|v| {
                values
                    .get(&v.key)
                    .copied()
                    .ok_or_else(|| ModelError::UnassignedVariable(v.key.to_string()))
            })
            .collect()
    }

    /// Every bound, domain and constraint broken by `values`.
    pub fn violations(
        &self,
        values: &HashMap<VarKey, f64>,
        tol: f64,
    ) -> Result<Vec<Violation>, ModelError> {
        let dense = self.dense_values(values)?;
        let mut out = Vec::new();

        for (var, &value) in self.vars.iter().zip(&dense) {
            let in_bounds = value >= var.lower - tol && value <= var.upper + tol;
            if !in_bounds || !var.domain.contains(value, tol) {
                out.push(Violation::Domain {
                    var: var.key.to_string(),
                    value,
                });
            }
        }

        for row in self.constraints() {
            if !row.is_satisfied(&dense, tol) {
                out.push(Violation::Constraint {
                    name: row.name.clone(),
                    lhs: row.expr.evaluate(&dense),
                    rhs: row.rhs,
                });
            }
        }

        Ok(out)
    }

    /// Whether `values` satisfies every bound, domain and constraint.
    pub fn is_feasible(&self, values: &HashMap<VarKey, f64>, tol: f64) -> Result<bool, ModelError> {
        Ok(self.violations(values, tol)?.is_empty())
    }

    /// Objective value at `values`.
    pub fn objective_value(&self, values: &HashMap<VarKey, f64>) -> Result<f64, ModelError> {
        let dense = self.dense_values(values)?;
        Ok(self.objective.expr.evaluate(&dense))
    }
}

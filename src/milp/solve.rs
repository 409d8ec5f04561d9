//! Solving through the bundled `microlp` branch-and-bound solver.

use std::collections::HashMap;

use log::{debug, info};
use microlp::{ComparisonOp, OptimizationDirection, Problem};

use super::expr::ConstraintSense;
use super::model::{Domain, MilpModel, ObjectiveSense, VarKey};

/// Error type for solving a model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("model is infeasible")]
    Infeasible,
    #[error("objective is unbounded")]
    Unbounded,
    #[error("solver error: {0}")]
    Solver(String),
}

impl From<microlp::Error> for SolveError {
    fn from(err: microlp::Error) -> Self {
        match err {
            microlp::Error::Infeasible => SolveError::Infeasible,
            microlp::Error::Unbounded => SolveError::Unbounded,
            other => SolveError::Solver(other.to_string()),
        }
    }
}

/// Optimal assignment returned by [`MilpModel::solve`].
#[derive(Debug, Clone)]
pub struct Solution {
    values: HashMap<VarKey, f64>,
    objective: f64,
}

impl Solution {
    /// Optimal objective value, including the expression constant.
    #[inline]
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Value of one variable.
    pub fn value(&self, key: VarKey) -> Option<f64> {
        self.values.get(&key).copied()
    }

    /// Every variable value, keyed like the model.
    pub fn values(&self) -> &HashMap<VarKey, f64> {
        &self.values
    }
}

impl MilpModel {
    /// Solve the model to optimality.
    ///
    /// Binary values are snapped to 0/1 when the solver returns them within
    /// rounding noise of an integer.
    pub fn solve(&self) -> Result<Solution, SolveError> {
        let direction = match self.objective().sense {
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
        };
        let mut problem = Problem::new(direction);

        let objective = &self.objective().expr;
        let mut lp_vars = Vec::with_capacity(self.n_vars());
        for (id, var) in self.variables().iter().enumerate() {
            let coeff = objective.coeff(id);
            let lp_var = match var.domain {
                Domain::Binary if var.lower == 0.0 && var.upper == 1.0 => {
                    problem.add_binary_var(coeff)
                }
                Domain::Binary => problem.add_integer_var(
                    coeff,
                    (var.lower.ceil() as i32, var.upper.floor() as i32),
                ),
                Domain::Reals | Domain::NonNegativeReals => {
                    problem.add_var(coeff, (var.lower, var.upper))
                }
            };
            lp_vars.push(lp_var);
        }

        for row in self.constraints() {
            let rhs = row.normalized_rhs();
            if row.expr.n_terms() == 0 {
                // A constant row is either vacuous or makes the model infeasible.
                if !row.sense.holds(0.0, rhs, 1e-9) {
                    return Err(SolveError::Infeasible);
                }
                continue;
            }
            let op = match row.sense {
                ConstraintSense::Le => ComparisonOp::Le,
                ConstraintSense::Ge => ComparisonOp::Ge,
                ConstraintSense::Eq => ComparisonOp::Eq,
            };
            let terms: Vec<_> = row.expr.terms().map(|(v, c)| (lp_vars[v], c)).collect();
            problem.add_constraint(&terms[..], op, rhs);
        }

        debug!(
            "solving model with {} variables and {} constraints",
            self.n_vars(),
            self.n_constraints()
        );
        let solution = problem.solve()?;

        let values = self
            .variables()
            .iter()
            .zip(&lp_vars)
            .map(|(var, &lp_var)| {
                let raw = solution[lp_var];
                let value = if var.domain == Domain::Binary && (raw - raw.round()).abs() < 1e-6 {
                    raw.round()
                } else {
                    raw
                };
                (var.key, value)
            })
            .collect();
        let objective = solution.objective() + objective.constant();
        info!("solved model, objective = {objective}");

        Ok(Solution { values, objective })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::milp::{Constraint, LinearExpr, Scope};
    use approx::assert_abs_diff_eq;

    #[test]
    fn solves_small_knapsack() {
        // max 3a + 2b + x  s.t. a + b <= 1, x <= 0.5
        let mut model = MilpModel::new(ObjectiveSense::Maximize);
        let a = model.var(VarKey::Selector { tree: 0, leaf: 0 });
        let b = model.var(VarKey::Selector { tree: 0, leaf: 1 });
        model.set_bounds(VarKey::Feature(0), 0.0, 0.5).unwrap();
        model
            .add_constraint(
                "pick_one",
                Constraint::le(LinearExpr::from_var(a, 1.0).with_term(b, 1.0), 1.0),
            )
            .unwrap();
        model.add_objective_term(VarKey::Selector { tree: 0, leaf: 0 }, 3.0);
        model.add_objective_term(VarKey::Selector { tree: 0, leaf: 1 }, 2.0);
        model.add_objective_term(VarKey::Feature(0), 1.0);

        let solution = model.solve().unwrap();
        assert_abs_diff_eq!(solution.objective(), 3.5, epsilon = 1e-6);
        assert_eq!(solution.value(VarKey::Selector { tree: 0, leaf: 0 }), Some(1.0));
        assert_eq!(solution.value(VarKey::Selector { tree: 0, leaf: 1 }), Some(0.0));
        assert_abs_diff_eq!(solution.value(VarKey::Feature(0)).unwrap(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn reports_infeasible() {
        let mut model = MilpModel::new(ObjectiveSense::Minimize);
        let y = model.var(VarKey::Output(Scope::Ensemble));
        model
            .add_component(
                "contradiction",
                vec![
                    Constraint::ge(LinearExpr::from_var(y, 1.0), 2.0),
                    Constraint::le(LinearExpr::from_var(y, 1.0), 1.0),
                ],
            )
            .unwrap();

        assert_eq!(model.solve().unwrap_err(), SolveError::Infeasible);
    }

    #[test]
    fn constant_rows_are_checked() {
        let mut model = MilpModel::new(ObjectiveSense::Minimize);
        model.set_bounds(VarKey::Feature(0), 0.0, 1.0).unwrap();
        model
            .add_constraint("impossible", Constraint::le(LinearExpr::from_const(2.0), 1.0))
            .unwrap();

        assert_eq!(model.solve().unwrap_err(), SolveError::Infeasible);
    }
}

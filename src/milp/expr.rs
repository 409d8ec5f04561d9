//! Linear expressions and constraint rows.

use std::collections::BTreeMap;

use super::VarId;

/// Relation between the left- and right-hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// `lhs <= rhs`
    Le,
    /// `lhs >= rhs`
    Ge,
    /// `lhs == rhs`
    Eq,
}

impl ConstraintSense {
    /// Operator as written in LP files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintSense::Le => "<=",
            ConstraintSense::Ge => ">=",
            ConstraintSense::Eq => "=",
        }
    }

    /// Whether `lhs (op) rhs` holds up to `tol`.
    #[inline]
    pub fn holds(&self, lhs: f64, rhs: f64, tol: f64) -> bool {
        match self {
            ConstraintSense::Le => lhs <= rhs + tol,
            ConstraintSense::Ge => lhs >= rhs - tol,
            ConstraintSense::Eq => (lhs - rhs).abs() <= tol,
        }
    }
}

/// `Σ coeff·var + constant` over model variables.
///
/// Terms on the same variable are merged, so a variable appears at most once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, f64>,
    constant: f64,
}

impl LinearExpr {
    /// The empty expression `0`.
    pub fn zero() -> Self {
        Self::default()
    }

    /// The constant expression `c`.
    pub fn from_const(c: f64) -> Self {
        Self {
            terms: BTreeMap::new(),
            constant: c,
        }
    }

    /// The single-term expression `coeff·var`.
    pub fn from_var(var: VarId, coeff: f64) -> Self {
        let mut expr = Self::zero();
        expr.add_term(var, coeff);
        expr
    }

    /// Add `coeff·var`, merging with an existing term on `var`.
    pub fn add_term(&mut self, var: VarId, coeff: f64) {
        *self.terms.entry(var).or_insert(0.0) += coeff;
    }

    /// Add a constant offset.
    pub fn add_constant(&mut self, c: f64) {
        self.constant += c;
    }

    /// Builder-style [`add_term`](Self::add_term).
    pub fn with_term(mut self, var: VarId, coeff: f64) -> Self {
        self.add_term(var, coeff);
        self
    }

    /// Builder-style [`add_constant`](Self::add_constant).
    pub fn with_constant(mut self, c: f64) -> Self {
        self.add_constant(c);
        self
    }

    /// Add every term and the constant of `other`.
    pub fn add_expr(&mut self, other: &LinearExpr) {
        self.constant += other.constant;
        for (&var, &coeff) in &other.terms {
            self.add_term(var, coeff);
        }
    }

    /// Iterate over the non-zero `(var, coeff)` terms in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, f64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, c)| **c != 0.0)
            .map(|(&v, &c)| (v, c))
    }

    /// Coefficient of `var` (zero when absent).
    pub fn coeff(&self, var: VarId) -> f64 {
        self.terms.get(&var).copied().unwrap_or(0.0)
    }

    /// Number of non-zero terms.
    pub fn n_terms(&self) -> usize {
        self.terms().count()
    }

    /// Constant offset.
    #[inline]
    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Value at `values`, indexed by variable id.
    ///
    /// # Panics
    ///
    /// Panics if a term references a variable beyond `values.len()`.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms().map(|(v, c)| c * values[v]).sum::<f64>() + self.constant
    }
}

/// One row `expr (sense) rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

impl Constraint {
    /// Create an unnamed row; the name is assigned on registration.
    pub fn new(expr: LinearExpr, sense: ConstraintSense, rhs: f64) -> Self {
        Self {
            name: String::new(),
            expr,
            sense,
            rhs,
        }
    }

    /// `expr <= rhs`
    pub fn le(expr: LinearExpr, rhs: f64) -> Self {
        Self::new(expr, ConstraintSense::Le, rhs)
    }

    /// `expr >= rhs`
    pub fn ge(expr: LinearExpr, rhs: f64) -> Self {
        Self::new(expr, ConstraintSense::Ge, rhs)
    }

    /// `expr == rhs`
    pub fn eq(expr: LinearExpr, rhs: f64) -> Self {
        Self::new(expr, ConstraintSense::Eq, rhs)
    }

    /// Right-hand side once the expression constant is moved across.
    #[inline]
    pub fn normalized_rhs(&self) -> f64 {
        self.rhs - self.expr.constant()
    }

    /// Whether the row holds at `values` up to `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        self.sense.holds(self.expr.evaluate(values), self.rhs, tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_merge_and_drop_zeros() {
        let expr = LinearExpr::zero()
            .with_term(2, 1.5)
            .with_term(0, 1.0)
            .with_term(2, -1.5)
            .with_constant(3.0);

        assert_eq!(expr.n_terms(), 1);
        assert_eq!(expr.terms().collect::<Vec<_>>(), vec![(0, 1.0)]);
        assert_eq!(expr.coeff(2), 0.0);
        assert_eq!(expr.constant(), 3.0);
    }

    #[test]
    fn add_expr_accumulates() {
        let mut a = LinearExpr::from_var(0, 1.0).with_constant(1.0);
        let b = LinearExpr::from_var(0, 2.0).with_term(1, -1.0).with_constant(2.0);
        a.add_expr(&b);

        assert_eq!(a.coeff(0), 3.0);
        assert_eq!(a.coeff(1), -1.0);
        assert_eq!(a.constant(), 3.0);
        assert_eq!(a.evaluate(&[1.0, 4.0]), 2.0);
    }

    #[test]
    fn constraint_satisfaction() {
        let row = Constraint::le(LinearExpr::from_var(0, 1.0).with_constant(1.0), 2.0);
        assert_eq!(row.normalized_rhs(), 1.0);
        assert!(row.is_satisfied(&[1.0], 0.0));
        assert!(!row.is_satisfied(&[1.5], 1e-9));
        assert!(row.is_satisfied(&[1.0 + 1e-10], 1e-9));

        let eq = Constraint::eq(LinearExpr::from_var(0, 2.0), 1.0);
        assert!(eq.is_satisfied(&[0.5], 1e-9));
        assert!(!eq.is_satisfied(&[0.6], 1e-9));

        let ge = Constraint::ge(LinearExpr::from_var(0, 1.0), 0.0);
        assert!(ge.is_satisfied(&[0.0], 0.0));
        assert!(!ge.is_satisfied(&[-0.1], 1e-9));
    }
}

//! CPLEX LP text export.
//!
//! Writes a [`MilpModel`] in the LP format read by most MILP solvers
//! (CPLEX, Gurobi, SCIP, HiGHS, CBC), so an embedded ensemble can be handed
//! to a solver other than the bundled one.

use std::io::{self, Write};

use super::model::{Domain, MilpModel, ObjectiveSense, VarKey};
use super::LinearExpr;

/// LP-safe identifier for a variable.
fn lp_var_name(key: &VarKey) -> String {
    match key {
        VarKey::Feature(i) => format!("x_{i}"),
        VarKey::Output(s) => format!("y_{s}"),
        VarKey::Selector { tree, leaf } => format!("l_{tree}_{leaf}"),
        VarKey::Violation(s) => format!("y_viol_{s}"),
        VarKey::Slack(s) => format!("v_{s}"),
        VarKey::SlackIndicator(s) => format!("v_ind_{s}"),
    }
}

/// Replace characters LP readers reject in row names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect::<String>()
        .trim_end_matches('_')
        .to_string()
}

fn write_terms(w: &mut impl Write, model: &MilpModel, expr: &LinearExpr) -> io::Result<()> {
    let mut first = true;
    for (var, coeff) in expr.terms() {
        let name = lp_var_name(&model.variable(var).key);
        if first {
            write!(w, "{coeff:+} {name}")?;
            first = false;
        } else {
            write!(w, " {coeff:+} {name}")?;
        }
    }
    if first {
        // LP readers need at least one term.
        let var = model.variables().first().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "model has no variables")
        })?;
        write!(w, "0 {}", lp_var_name(&var.key))?;
    }
    Ok(())
}

impl MilpModel {
    /// Write the model in CPLEX LP format.
    ///
    /// Expression constants are moved to the right-hand side; the objective
    /// constant is dropped since it does not move the optimum. Rows without
    /// terms are written against a zero-coefficient variable.
    ///
    /// # Errors
    ///
    /// Writer failures, or [`io::ErrorKind::InvalidInput`] for a model
    /// without variables.
    pub fn write_lp(&self, w: &mut impl Write) -> io::Result<()> {
        for var in self.variables() {
            if var.label != var.key.to_string() {
                writeln!(w, "\\ {} = {}", lp_var_name(&var.key), var.label)?;
            }
        }

        match self.objective().sense {
            ObjectiveSense::Maximize => writeln!(w, "Maximize")?,
            ObjectiveSense::Minimize => writeln!(w, "Minimize")?,
        }
        write!(w, " obj: ")?;
        write_terms(w, self, &self.objective().expr)?;
        writeln!(w)?;

        writeln!(w, "Subject To")?;
        for row in self.constraints() {
            write!(w, " {}: ", sanitize(&row.name))?;
            write_terms(w, self, &row.expr)?;
            writeln!(w, " {} {}", row.sense.as_str(), row.normalized_rhs())?;
        }

        writeln!(w, "Bounds")?;
        for var in self.variables() {
            let name = lp_var_name(&var.key);
            let (dom_lower, dom_upper) = var.domain.bounds();
            if var.lower == var.upper {
                writeln!(w, " {name} = {}", var.lower)?;
            } else if var.lower == f64::NEG_INFINITY && var.upper == f64::INFINITY {
                writeln!(w, " {name} free")?;
            } else if var.lower != dom_lower || var.upper != dom_upper || var.domain == Domain::Reals {
                let lower = if var.lower == f64::NEG_INFINITY {
                    "-inf".to_string()
                } else {
                    var.lower.to_string()
                };
                let upper = if var.upper == f64::INFINITY {
                    "+inf".to_string()
                } else {
                    var.upper.to_string()
                };
                writeln!(w, " {lower} <= {name} <= {upper}")?;
            }
        }

        let binaries: Vec<_> = self
            .variables()
            .iter()
            .filter(|v| v.domain == Domain::Binary)
            .collect();
        if !binaries.is_empty() {
            writeln!(w, "Binary")?;
            for var in binaries {
                writeln!(w, " {}", lp_var_name(&var.key))?;
            }
        }

        writeln!(w, "End")
    }

    /// The model as CPLEX LP text.
    pub fn to_lp_string(&self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.write_lp(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

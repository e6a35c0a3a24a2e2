//! Mixed-integer linear program model.
//!
//! Problems are built once per query and handed to a solver backend through
//! the [`IlpSolver`](crate::features::ilp::ports::IlpSolver) port. Every
//! variable carries explicit finite bounds; the in-crate reference backend
//! relies on that to shift into standard form.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a variable within its problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// Integer variable restricted to {0, 1}.
    Binary,
    Integer,
    Continuous,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmp {
    Le,
    Ge,
    Eq,
}

impl fmt::Display for Cmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmp::Le => write!(f, "<="),
            Cmp::Ge => write!(f, ">="),
            Cmp::Eq => write!(f, "="),
        }
    }
}

/// Sum of weighted variables. Terms may repeat a variable; they are summed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinExpr {
    pub terms: Vec<(VarId, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        LinExpr { terms: Vec::new() }
    }

    pub fn term(var: VarId, coeff: f64) -> Self {
        LinExpr {
            terms: vec![(var, coeff)],
        }
    }

    pub fn add_term(&mut self, var: VarId, coeff: f64) -> &mut Self {
        self.terms.push((var, coeff));
        self
    }

    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        LinExpr {
            terms: vars.into_iter().map(|v| (v, 1.0)).collect(),
        }
    }

    /// Dense coefficient vector over `num_vars` variables.
    pub fn to_dense(&self, num_vars: usize) -> Vec<f64> {
        let mut dense = vec![0.0; num_vars];
        for (var, coeff) in &self.terms {
            dense[var.0] += coeff;
        }
        dense
    }

    /// Evaluate under an assignment.
    pub fn eval(&self, assignment: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|(var, coeff)| coeff * assignment[var.0])
            .sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub expr: LinExpr,
    pub cmp: Cmp,
    pub rhs: f64,
}

/// A complete MILP instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlpProblem {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    pub objective: LinExpr,
    pub sense: Sense,
}

impl IlpProblem {
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        IlpProblem {
            name: name.into(),
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: LinExpr::new(),
            sense,
        }
    }

    pub fn add_binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name, VarKind::Binary, 0.0, 1.0)
    }

    pub fn add_variable(
        &mut self,
        name: impl Into<String>,
        kind: VarKind,
        lower: f64,
        upper: f64,
    ) -> VarId {
        debug_assert!(lower.is_finite() && upper.is_finite());
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name: name.into(),
            kind,
            lower,
            upper,
        });
        id
    }

    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        expr: LinExpr,
        cmp: Cmp,
        rhs: f64,
    ) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr,
            cmp,
            rhs,
        });
    }

    pub fn set_objective(&mut self, expr: LinExpr, sense: Sense) {
        self.objective = expr;
        self.sense = sense;
    }

    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    /// Render in CPLEX LP format, for debug artifacts.
    pub fn render_lp(&self) -> String {
        fn render_expr(problem: &IlpProblem, expr: &LinExpr) -> String {
            let dense = expr.to_dense(problem.num_vars());
            let mut parts = Vec::new();
            for (i, coeff) in dense.iter().enumerate() {
                if *coeff == 0.0 {
                    continue;
                }
                let name = &problem.variables[i].name;
                if parts.is_empty() {
                    parts.push(format!("{coeff} {name}"));
                } else if *coeff < 0.0 {
                    parts.push(format!("- {} {name}", -coeff));
                } else {
                    parts.push(format!("+ {coeff} {name}"));
                }
            }
            if parts.is_empty() {
                "0".to_string()
            } else {
                parts.join(" ")
            }
        }

        let mut out = format!("\\ Problem: {}\n", self.name);
        out.push_str(match self.sense {
            Sense::Maximize => "Maximize\n",
            Sense::Minimize => "Minimize\n",
        });
        out.push_str(&format!(" obj: {}\n", render_expr(self, &self.objective)));
        out.push_str("Subject To\n");
        for constraint in &self.constraints {
            out.push_str(&format!(
                " {}: {} {} {}\n",
                constraint.name,
                render_expr(self, &constraint.expr),
                constraint.cmp,
                constraint.rhs
            ));
        }
        out.push_str("Bounds\n");
        for var in &self.variables {
            out.push_str(&format!(" {} <= {} <= {}\n", var.lower, var.name, var.upper));
        }
        let binaries: Vec<&str> = self
            .variables
            .iter()
            .filter(|v| v.kind == VarKind::Binary)
            .map(|v| v.name.as_str())
            .collect();
        if !binaries.is_empty() {
            out.push_str("Binary\n ");
            out.push_str(&binaries.join(" "));
            out.push('\n');
        }
        let integers: Vec<&str> = self
            .variables
            .iter()
            .filter(|v| v.kind == VarKind::Integer)
            .map(|v| v.name.as_str())
            .collect();
        if !integers.is_empty() {
            out.push_str("General\n ");
            out.push_str(&integers.join(" "));
            out.push('\n');
        }
        out.push_str("End\n");
        out
    }
}

/// Result of a solver run.
#[derive(Debug, Clone, PartialEq)]
pub enum IlpOutcome {
    Optimal {
        objective: f64,
        assignment: Vec<f64>,
    },
    /// Infeasible or unbounded; the backends do not distinguish the two
    /// because every variable is bounded.
    NoSolution,
}

impl IlpOutcome {
    pub fn objective(&self) -> Option<f64> {
        match self {
            IlpOutcome::Optimal { objective, .. } => Some(*objective),
            IlpOutcome::NoSolution => None,
        }
    }
}

// Copyright 2026 by the timetabler authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

//! A small finite-domain constraint model and the solver interface used by the timetable rules.
//!
//! The model knows bounded integer variables (booleans are integers with domain {0, 1}), three kinds of constraints
//! (bounded linear sums, clauses over boolean literals and reified equalities `b ⇔ x == k`) and a single minimization
//! objective consisting of excess terms `max(expr - threshold, 0)`.
//!
//! Solving is hidden behind the `Solver` trait. `SearchSolver` is the built-in implementation, which does constraint
//! propagation in every node of a parallel branch and bound search (see `bab`).

mod domain;
mod propagation;
mod search;

pub use domain::Domain;
pub use search::SearchSolver;

use crate::Error;
use std::time::Duration;

/// Handle of an integer variable in a `Model`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntVar(usize);

/// Handle of a boolean variable in a `Model`. Booleans share the index space of integer variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoolVar(usize);

impl IntVar {
    pub fn index(self) -> usize {
        self.0
    }
}

impl BoolVar {
    pub fn index(self) -> usize {
        self.0
    }

    /// The boolean as 0/1 integer variable, e.g. for use in linear sums
    pub fn as_int(self) -> IntVar {
        IntVar(self.0)
    }

    /// The negative literal of this variable
    pub fn negated(self) -> Literal {
        Literal {
            var: self,
            positive: false,
        }
    }
}

/// A boolean variable or its negation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Literal {
    pub var: BoolVar,
    pub positive: bool,
}

impl From<BoolVar> for Literal {
    fn from(var: BoolVar) -> Self {
        Literal {
            var,
            positive: true,
        }
    }
}

/// A linear expression `Σ coef·var + constant`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LinearExpr {
    pub(crate) terms: Vec<(i64, IntVar)>,
    pub(crate) constant: i64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of boolean variables, i.e. the number of true variables
    pub fn count<I: IntoIterator<Item = BoolVar>>(vars: I) -> Self {
        LinearExpr {
            terms: vars.into_iter().map(|b| (1, b.as_int())).collect(),
            constant: 0,
        }
    }

    pub fn add_term(&mut self, coefficient: i64, var: IntVar) {
        if coefficient != 0 {
            self.terms.push((coefficient, var));
        }
    }

    pub fn add_constant(&mut self, constant: i64) {
        self.constant += constant;
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Multiply all coefficients and the constant by `factor`
    pub fn scaled(mut self, factor: i64) -> Self {
        for (c, _) in self.terms.iter_mut() {
            *c *= factor;
        }
        self.constant *= factor;
        self
    }
}

/// Relation between a linear expression and its right hand side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Comparison {
    LessEqual,
    GreaterEqual,
    Equal,
}

/// Constraints as stored in the model. Linear constraints are normalized to `lo <= Σ coef·var <= hi`.
#[derive(Clone, Debug)]
pub(crate) enum Constraint {
    Linear {
        terms: Vec<(i64, usize)>,
        lo: i64,
        hi: i64,
    },
    Clause(Vec<Literal>),
    ReifiedEqual {
        indicator: usize,
        var: usize,
        value: i64,
    },
}

impl Constraint {
    /// Indexes of all variables the constraint refers to
    pub(crate) fn variables(&self) -> Vec<usize> {
        match self {
            Constraint::Linear { terms, .. } => terms.iter().map(|(_, v)| *v).collect(),
            Constraint::Clause(lits) => lits.iter().map(|l| l.var.0).collect(),
            Constraint::ReifiedEqual { indicator, var, .. } => vec![*indicator, *var],
        }
    }
}

/// One term `max(expr - threshold, 0)` of the objective function
#[derive(Clone, Debug, PartialEq)]
pub struct ExcessTerm {
    pub expr: LinearExpr,
    pub threshold: i64,
}

/// Objective function to be minimized: the sum of all excess terms
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Objective {
    pub terms: Vec<ExcessTerm>,
}

/// A constraint model, consisting of variables with their initial domains, constraints and an optional objective
#[derive(Clone, Debug, Default)]
pub struct Model {
    pub(crate) domains: Vec<Domain>,
    pub(crate) names: Vec<String>,
    /// Marks variables to branch on first. Other variables are expected to be fixed by propagation.
    pub(crate) decision: Vec<bool>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: Option<Objective>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    fn push_var(&mut self, domain: Domain, name: String, decision: bool) -> usize {
        self.domains.push(domain);
        self.names.push(name);
        self.decision.push(decision);
        self.domains.len() - 1
    }

    /// Create a decision variable with the given finite domain. All values must be within `0..=Domain::MAX_VALUE`.
    pub fn new_int_var<I: IntoIterator<Item = i64>>(&mut self, values: I, name: String) -> Result<IntVar, Error> {
        let domain = Domain::from_values(values).ok_or_else(|| {
            Error::Model(format!(
                "Domain of variable {} exceeds the supported range 0..={}",
                name,
                Domain::MAX_VALUE
            ))
        })?;
        Ok(IntVar(self.push_var(domain, name, true)))
    }

    /// Create an auxiliary boolean variable (not branched on, unless propagation leaves it open)
    pub fn new_bool_var(&mut self, name: String) -> BoolVar {
        BoolVar(self.push_var(Domain::BOOL, name, false))
    }

    pub fn num_vars(&self) -> usize {
        self.domains.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn name(&self, var: IntVar) -> &str {
        &self.names[var.0]
    }

    pub fn domain(&self, var: IntVar) -> Domain {
        self.domains[var.0]
    }

    /// Restrict a variable to a single value. An impossible value empties the domain, which makes the model
    /// infeasible.
    pub fn fix(&mut self, var: IntVar, value: i64) {
        self.domains[var.0].fix(value);
    }

    /// Add the constraint `expr <cmp> rhs`
    pub fn add_linear(&mut self, expr: LinearExpr, cmp: Comparison, rhs: i64) {
        let rhs = rhs - expr.constant;
        let (lo, hi) = match cmp {
            Comparison::LessEqual => (i64::MIN, rhs),
            Comparison::GreaterEqual => (rhs, i64::MAX),
            Comparison::Equal => (rhs, rhs),
        };
        let terms = expr.terms.into_iter().map(|(c, v)| (c, v.0)).collect();
        self.constraints.push(Constraint::Linear { terms, lo, hi });
    }

    /// Add the clause `l_1 ∨ l_2 ∨ ...`
    pub fn add_clause(&mut self, literals: Vec<Literal>) {
        self.constraints.push(Constraint::Clause(literals));
    }

    /// Add the implication `a ⇒ b`
    pub fn add_implication(&mut self, a: Literal, b: Literal) {
        let not_a = Literal {
            var: a.var,
            positive: !a.positive,
        };
        self.add_clause(vec![not_a, b]);
    }

    /// Add the reification `indicator ⇔ (var == value)`
    pub fn add_reified_equal(&mut self, indicator: BoolVar, var: IntVar, value: i64) {
        self.constraints.push(Constraint::ReifiedEqual {
            indicator: indicator.0,
            var: var.0,
            value,
        });
    }

    /// Set the objective function to be minimized. Only one objective may be set per model.
    pub fn minimize(&mut self, objective: Objective) -> Result<(), Error> {
        if self.objective.is_some() {
            return Err(Error::Model(
                "The model already has an objective. Penalty terms must be collected before minimizing.".to_owned(),
            ));
        }
        self.objective = Some(objective);
        Ok(())
    }

    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }
}

/// Result status of a solver run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// A solution was found and proven to be optimal (or any solution, if the model has no objective)
    Optimal,
    /// A solution was found, but the search was stopped by a limit before proving optimality
    Feasible,
    /// The constraints admit no solution
    Infeasible,
    /// The model cannot be solved by this solver
    ModelInvalid,
    /// The search was stopped by a limit before any solution was found
    Unknown,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Optimal => "OPTIMAL",
            Status::Feasible => "FEASIBLE",
            Status::Infeasible => "INFEASIBLE",
            Status::ModelInvalid => "MODEL_INVALID",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Result of a solver run
#[derive(Clone, Debug)]
pub struct Solution {
    pub status: Status,
    /// Values of all variables, indexed like the model's variables. Empty unless a solution was found.
    pub values: Vec<i64>,
    /// Objective value of the solution, if the model had an objective
    pub objective: Option<i64>,
    /// Number of search nodes evaluated
    pub nodes: u64,
}

impl Solution {
    pub fn empty(status: Status, nodes: u64) -> Self {
        Solution {
            status,
            values: Vec::new(),
            objective: None,
            nodes,
        }
    }

    pub fn is_solution_found(&self) -> bool {
        matches!(self.status, Status::Optimal | Status::Feasible)
    }

    pub fn value(&self, var: IntVar) -> Option<i64> {
        self.values.get(var.0).copied()
    }

    pub fn bool_value(&self, var: BoolVar) -> Option<bool> {
        self.value(var.as_int()).map(|v| v != 0)
    }
}

/// Limits and parallelism of a solver run
#[derive(Clone, Debug)]
pub struct SolverConfig {
    pub num_threads: u32,
    pub node_limit: Option<u64>,
    pub time_limit: Option<Duration>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            num_threads: num_cpus::get() as u32,
            node_limit: None,
            time_limit: None,
        }
    }
}

/// Interface of a solving engine for `Model`s
pub trait Solver {
    fn solve(&self, model: &Model) -> Solution;
}

/// Evaluate the objective for a full assignment of values
pub(crate) fn objective_value(objective: &Objective, values: &[i64]) -> i64 {
    objective
        .terms
        .iter()
        .map(|t| {
            let sum: i64 = t.expr.constant + t.expr.terms.iter().map(|(c, v)| c * values[v.0]).sum::<i64>();
            (sum - t.threshold).max(0)
        })
        .sum()
}

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

//! A specialization of the generic branch and bound algorithm from `bab` for constraint models.
//!
//! Each node carries the complete variable domains of its subproblem. Solving a node means propagating the
//! constraints, bounding the node by the objective's lower bound and either reporting the (then fully fixed)
//! assignment or branching on the open variable with the smallest domain: `x == v` vs. `x != v` for the smallest
//! value `v`.

use super::propagation::Propagator;
use super::{Domain, Model, Objective, Solution, Solver, SolverConfig, Status};
use crate::bab::{self, Limits, NodeResult};
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;

/// The built-in `Solver`: constraint propagation within a parallel branch and bound search
#[derive(Clone, Debug, Default)]
pub struct SearchSolver {
    pub config: SolverConfig,
}

impl SearchSolver {
    pub fn new(config: SolverConfig) -> Self {
        SearchSolver { config }
    }
}

/// Parameter set for one subproblem of the Branch and Bound algorithm
#[derive(Clone)]
struct SearchNode {
    domains: Vec<Domain>,
    /// Number of branching decisions leading to this node
    depth: usize,
    /// Marks the preferred branch (`x == v`) among siblings
    preferred: bool,
    /// The variable restricted by the last branching decision (None for the root node)
    changed: Option<usize>,
}

// As we want to do a pseudo depth-first search, SearchNodes are ordered by their depth in the Branch and Bound tree for
// the prioritization by the parallel workers.
impl Ord for SearchNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.depth, self.preferred).cmp(&(other.depth, other.preferred))
    }
}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for SearchNode {}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        (self.depth, self.preferred) == (other.depth, other.preferred)
    }
}

impl Solver for SearchSolver {
    fn solve(&self, model: &Model) -> Solution {
        info!(
            "Solving model with {} variables and {} constraints using {} threads",
            model.num_vars(),
            model.num_constraints(),
            self.config.num_threads
        );
        let propagator = Arc::new(Propagator::new(Arc::new(model.clone())));
        let root = SearchNode {
            domains: model.domains.clone(),
            depth: 0,
            preferred: false,
            changed: None,
        };
        let limits = Limits {
            max_nodes: self.config.node_limit,
            deadline: self.config.time_limit.map(|t| Instant::now() + t),
        };

        let outcome = bab::solve(
            move |node, best| run_search_node(&propagator, node, best),
            root,
            self.config.num_threads,
            0,
            limits,
        );
        debug!("Search finished after {} nodes", outcome.num_nodes);

        match (outcome.best, outcome.complete) {
            (Some((values, score)), complete) => Solution {
                status: if complete { Status::Optimal } else { Status::Feasible },
                values,
                objective: model.objective.as_ref().map(|_| score),
                nodes: outcome.num_nodes,
            },
            (None, true) => Solution::empty(Status::Infeasible, outcome.num_nodes),
            (None, false) => Solution::empty(Status::Unknown, outcome.num_nodes),
        }
    }
}

/// Lower bound of the objective function for the given domains
fn objective_bound(objective: &Objective, domains: &[Domain]) -> i64 {
    objective
        .terms
        .iter()
        .map(|t| {
            let min: i64 = t.expr.constant
                + t.expr
                    .terms
                    .iter()
                    .map(|(c, v)| {
                        let d = domains[v.index()];
                        if *c >= 0 {
                            c * d.min()
                        } else {
                            c * d.max()
                        }
                    })
                    .sum::<i64>();
            (min - t.threshold).max(0)
        })
        .sum()
}

/// Choose the open variable to branch on: decision variables first, smallest domain first.
fn select_variable(model: &Model, domains: &[Domain]) -> Option<usize> {
    domains
        .iter()
        .enumerate()
        .filter(|(_, d)| d.size() > 1)
        .min_by_key(|(i, d)| (!model.decision[*i], d.size(), *i))
        .map(|(i, _)| i)
}

/// Solver for a single branch and bound node/subproblem.
fn run_search_node(
    propagator: &Propagator,
    mut node: SearchNode,
    best_score: i64,
) -> NodeResult<SearchNode, Vec<i64>, i64> {
    if propagator.propagate(&mut node.domains, node.changed).is_err() {
        return NodeResult::NoSolution;
    }
    let model = propagator.model();
    let bound = model
        .objective
        .as_ref()
        .map_or(0, |o| objective_bound(o, &node.domains));
    if bound >= best_score {
        return NodeResult::NoSolution;
    }

    let var = match select_variable(model, &node.domains) {
        None => {
            let values: Vec<i64> = node.domains.iter().map(|d| d.min()).collect();
            let score = model
                .objective
                .as_ref()
                .map_or(0, |o| super::objective_value(o, &values));
            return NodeResult::Feasible(values, score);
        }
        Some(var) => var,
    };

    let value = node.domains[var].min();
    let mut take = node.clone();
    take.domains[var].fix(value);
    take.depth += 1;
    take.preferred = true;
    take.changed = Some(var);

    node.domains[var].remove(value);
    node.depth += 1;
    node.preferred = false;
    node.changed = Some(var);

    NodeResult::Branch(vec![node, take], bound)
}

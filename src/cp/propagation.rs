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

//! Constraint propagation: Every constraint removes values from its variables' domains, which cannot be part of any
//! solution given the other variables' domains. This is repeated (queue-based, triggered by changed variables) until
//! a fixpoint is reached or some domain becomes empty.

use super::{Constraint, Domain, Literal, Model};
use std::collections::VecDeque;
use std::sync::Arc;

/// Marker for a wiped-out domain
#[derive(Debug, PartialEq, Eq)]
pub struct Conflict;

/// Propagation engine for one model. It is shared (read-only) between all search threads.
pub struct Propagator {
    model: Arc<Model>,
    /// Indexes of the constraints each variable is part of
    watchers: Vec<Vec<usize>>,
}

impl Propagator {
    pub fn new(model: Arc<Model>) -> Self {
        let mut watchers = vec![Vec::new(); model.num_vars()];
        for (i, c) in model.constraints.iter().enumerate() {
            let mut vars = c.variables();
            vars.sort_unstable();
            vars.dedup();
            for v in vars {
                watchers[v].push(i);
            }
        }
        Propagator { model, watchers }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Propagate all constraints (`changed == None`) or only those watching the given variable until fixpoint.
    pub fn propagate(&self, domains: &mut [Domain], changed: Option<usize>) -> Result<(), Conflict> {
        if domains.iter().any(|d| d.is_empty()) {
            return Err(Conflict);
        }
        let num_constraints = self.model.constraints.len();
        let mut queue = VecDeque::<usize>::new();
        let mut queued = vec![false; num_constraints];
        match changed {
            None => {
                queue.extend(0..num_constraints);
                queued.iter_mut().for_each(|q| *q = true);
            }
            Some(var) => {
                for &c in self.watchers[var].iter() {
                    queue.push_back(c);
                    queued[c] = true;
                }
            }
        }

        let mut changed_vars = Vec::new();
        while let Some(c) = queue.pop_front() {
            queued[c] = false;
            revise(&self.model.constraints[c], domains, &mut changed_vars)?;
            for v in changed_vars.drain(..) {
                for &w in self.watchers[v].iter() {
                    if !queued[w] {
                        queued[w] = true;
                        queue.push_back(w);
                    }
                }
            }
        }
        Ok(())
    }
}

fn revise(constraint: &Constraint, domains: &mut [Domain], changed: &mut Vec<usize>) -> Result<(), Conflict> {
    match constraint {
        Constraint::Linear { terms, lo, hi } => revise_linear(terms, *lo, *hi, domains, changed),
        Constraint::Clause(literals) => revise_clause(literals, domains, changed),
        Constraint::ReifiedEqual {
            indicator,
            var,
            value,
        } => revise_reified(*indicator, *var, *value, domains, changed),
    }
}

/// Apply a domain modification and record the variable if it changed
fn update<F: FnOnce(&mut Domain) -> bool>(
    domains: &mut [Domain],
    var: usize,
    changed: &mut Vec<usize>,
    f: F,
) -> Result<(), Conflict> {
    if f(&mut domains[var]) {
        if domains[var].is_empty() {
            return Err(Conflict);
        }
        changed.push(var);
    }
    Ok(())
}

fn term_bounds(coefficient: i64, domain: Domain) -> (i64, i64) {
    if coefficient >= 0 {
        (coefficient * domain.min(), coefficient * domain.max())
    } else {
        (coefficient * domain.max(), coefficient * domain.min())
    }
}

fn div_floor(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

fn div_ceil(a: i64, b: i64) -> i64 {
    let q = a / b;
    if a % b != 0 && ((a < 0) == (b < 0)) {
        q + 1
    } else {
        q
    }
}

/// Bounds propagation for `lo <= Σ c·x <= hi`
fn revise_linear(
    terms: &[(i64, usize)],
    lo: i64,
    hi: i64,
    domains: &mut [Domain],
    changed: &mut Vec<usize>,
) -> Result<(), Conflict> {
    let mut sum_min = 0i64;
    let mut sum_max = 0i64;
    for (c, v) in terms.iter() {
        let (mn, mx) = term_bounds(*c, domains[*v]);
        sum_min += mn;
        sum_max += mx;
    }
    if sum_min > hi || sum_max < lo {
        return Err(Conflict);
    }

    for (c, v) in terms.iter() {
        let (c, v) = (*c, *v);
        if c == 0 {
            continue;
        }
        let (mn, mx) = term_bounds(c, domains[v]);
        let mut x_lo = i64::MIN;
        let mut x_hi = i64::MAX;
        if hi != i64::MAX {
            // c·x <= hi - (minimum of all other terms)
            let upper = hi - (sum_min - mn);
            if c > 0 {
                x_hi = div_floor(upper, c);
            } else {
                x_lo = div_ceil(upper, c);
            }
        }
        if lo != i64::MIN {
            // c·x >= lo - (maximum of all other terms)
            let lower = lo - (sum_max - mx);
            if c > 0 {
                x_lo = x_lo.max(div_ceil(lower, c));
            } else {
                x_hi = x_hi.min(div_floor(lower, c));
            }
        }
        update(domains, v, changed, |d| d.retain_range(x_lo, x_hi))?;
    }
    Ok(())
}

fn revise_clause(literals: &[Literal], domains: &mut [Domain], changed: &mut Vec<usize>) -> Result<(), Conflict> {
    let mut open: Option<Literal> = None;
    let mut num_open = 0;
    for lit in literals.iter() {
        let d = domains[lit.var.index()];
        match d.value() {
            Some(v) => {
                if (v == 1) == lit.positive {
                    return Ok(());
                }
            }
            None => {
                num_open += 1;
                open = Some(*lit);
            }
        }
    }
    match (num_open, open) {
        (0, _) => Err(Conflict),
        (1, Some(lit)) => {
            let value = if lit.positive { 1 } else { 0 };
            update(domains, lit.var.index(), changed, |d| d.fix(value))
        }
        _ => Ok(()),
    }
}

/// Propagation for `indicator ⇔ (var == value)`
fn revise_reified(
    indicator: usize,
    var: usize,
    value: i64,
    domains: &mut [Domain],
    changed: &mut Vec<usize>,
) -> Result<(), Conflict> {
    if !domains[var].contains(value) {
        update(domains, indicator, changed, |d| d.fix(0))?;
    } else if domains[var].value() == Some(value) {
        update(domains, indicator, changed, |d| d.fix(1))?;
    }
    match domains[indicator].value() {
        Some(1) => update(domains, var, changed, |d| d.fix(value)),
        Some(0) => update(domains, var, changed, |d| d.remove(value)),
        _ => Ok(()),
    }
}

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

//! Soft constraints: collection of penalty terms and the daily load penalty

use crate::catalog::Catalog;
use crate::cp::{ExcessTerm, LinearExpr, Objective};
use crate::io::config::LoadWeightsConfig;
use crate::session::Session;
use crate::Error;
use log::debug;
use std::collections::BTreeMap;

/// Scaling factor to turn fractional weights and thresholds into integers
pub const WEIGHT_SCALE: f64 = 100.0;
/// Tolerance factor applied to the load thresholds
pub const THRESHOLD_TOLERANCE: f64 = 1.05;

/// Collects the penalty terms of all soft constraints of a session. They are compiled into a single objective function
/// when the session is sealed.
#[derive(Clone, Debug, Default)]
pub struct PenaltyAccumulator {
    terms: Vec<ExcessTerm>,
}

impl PenaltyAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the penalty `weight · max(expr - threshold, 0)`
    pub fn add_excess(&mut self, expr: LinearExpr, threshold: i64, weight: i64) {
        if weight <= 0 || expr.is_empty() {
            return;
        }
        self.terms.push(ExcessTerm {
            expr: expr.scaled(weight),
            threshold: threshold * weight,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// The objective function: the sum of all penalty terms. `None` if no soft constraints were added.
    pub fn compile(self) -> Option<Objective> {
        if self.terms.is_empty() {
            None
        } else {
            Some(Objective { terms: self.terms })
        }
    }
}

/// Resolved daily load weights. Weights and thresholds are scaled by `WEIGHT_SCALE`.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadWeights {
    /// Scaled weight per subject index
    pub weights: BTreeMap<usize, i64>,
    /// Scaled, tolerant threshold per level index. `None` for exempt levels.
    pub thresholds: Vec<Option<i64>>,
    pub penalty_weight: i64,
}

fn scale_threshold(threshold: f64) -> Option<i64> {
    if threshold <= 0.0 {
        None
    } else {
        Some((threshold * THRESHOLD_TOLERANCE * WEIGHT_SCALE).floor() as i64)
    }
}

impl LoadWeights {
    pub fn resolve(config: &LoadWeightsConfig, catalog: &Catalog) -> Result<Self, Error> {
        let mut weights = BTreeMap::new();
        for (subject, weight) in config.weights.iter() {
            let scaled = (weight * WEIGHT_SCALE).round() as i64;
            if scaled < 0 {
                return Err(Error::Configuration(format!("Negative load weight for subject {}", subject)));
            }
            weights.insert(catalog.subject(subject)?, scaled);
        }
        let mut thresholds = vec![config.default_threshold.and_then(scale_threshold); catalog.levels.len()];
        for (level, threshold) in config.thresholds.iter() {
            thresholds[catalog.level(level)?] = scale_threshold(*threshold);
        }
        Ok(LoadWeights {
            weights,
            thresholds,
            penalty_weight: config.penalty_weight,
        })
    }
}

/// Penalize the daily load of each class (and each of its sub-groups) exceeding its level's threshold
pub fn add_load_penalty(session: &mut Session, weights: &LoadWeights) {
    let num_days = session.catalog().grid.num_days();
    let num_slots = session.catalog().grid.num_slots();
    let mut added = 0;
    for class in 0..session.catalog().classes.len() {
        let entity = session.catalog().classes[class].clone();
        let threshold = match weights.thresholds[entity.level] {
            Some(t) => t,
            None => continue,
        };
        let subjects: Vec<(usize, i64)> = session
            .catalog()
            .allowed_subjects(class)
            .filter_map(|s| weights.weights.get(&s).map(|w| (s, *w)))
            .filter(|(_, w)| *w > 0)
            .collect();
        let groups = std::iter::once(Vec::new()).chain(entity.subgroups.iter().map(|g| g.skipped_subjects.clone()));
        for skipped in groups {
            for day in 0..num_days {
                let mut load = LinearExpr::new();
                for slot in 0..num_slots {
                    for (subject, weight) in subjects.iter().filter(|(s, _)| !skipped.contains(s)) {
                        load.add_term(*weight, session.has_subject(class, day, slot, *subject).as_int());
                    }
                }
                session
                    .penalties_mut()
                    .add_excess(load, threshold, weights.penalty_weight);
                added += 1;
            }
        }
    }
    debug!("Added {} daily load penalty terms", added);
}

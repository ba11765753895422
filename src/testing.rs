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

//! Fixtures for the unit tests

use crate::cp::{SearchSolver, SolverConfig};
use crate::io::config::{self, Configuration};
use crate::session::Session;
use crate::{SolveOutcome, Timetable};
use serde_json::json;

/// The configuration from `io/test_ressources/simple_config.json`
pub fn simple_config() -> Configuration {
    let data = include_bytes!("io/test_ressources/simple_config.json");
    config::read(&data[..]).unwrap()
}

pub fn simple_session() -> Session {
    crate::build_session(&simple_config()).unwrap()
}

/// A small problem without any rules: two classes "L1a" and "L1b" of level "L1", two days with four slots each
/// (lunch boundary at slot "S3"), subjects "A" (2 hours, teacher "TA") and "B" (2 hours, teacher "TB") and rooms "R1"
/// and "R2".
pub fn tiny_config() -> Configuration {
    serde_json::from_value(json!({
        "days": ["D1", "D2"],
        "slots": ["S1", "S2", "S3", "S4"],
        "lunch_boundary": 2,
        "subjects": ["A", "B", "C"],
        "quotas": {"L1": {"A": 2, "B": 2}},
        "teachers": {"A": "TA", "B": "TB"},
        "classes": [
            {"name": "L1a", "capacity": 20},
            {"name": "L1b", "capacity": 30}
        ],
        "rooms": ["R1", "R2"]
    }))
    .unwrap()
}

/// A sequential solver, which produces reproducible results
pub fn solver() -> SearchSolver {
    SearchSolver::new(SolverConfig {
        num_threads: 1,
        node_limit: None,
        time_limit: None,
    })
}

/// Build the session for a configuration and solve it
pub fn solve(config: &Configuration) -> SolveOutcome {
    let session = crate::build_session(config).unwrap();
    crate::solve(session, &solver()).unwrap()
}

/// Build the session for a configuration and solve it, expecting a solution
pub fn solve_feasible(config: &Configuration) -> Timetable {
    match solve(config) {
        SolveOutcome::Solved(timetable) => timetable,
        SolveOutcome::Infeasible => panic!("Expected a timetable, but the problem is infeasible"),
    }
}

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

//! School timetable generation as a constraint model.
//!
//! A `Configuration` (see `io::config`) is resolved into a `Catalog` of days, slots, subjects, levels, classes, rooms
//! and teachers. A `Session` creates one subject variable and one room variable per (class, day, slot) and the weekly
//! quota constraints. The rule modules in `rules` add further constraints (or penalty terms) to the session. Finally,
//! `solve::solve()` seals the session, hands the model to a `cp::Solver` and returns a `Timetable`.

mod bab;
pub mod catalog;
pub mod cp;
pub mod io;
pub mod objective;
pub mod rules;
pub mod session;
pub mod solve;

#[cfg(test)]
mod testing;

pub use catalog::Catalog;
pub use session::Session;
pub use solve::{solve, SolveOutcome, Timetable};

/// Subject index meaning "no class scheduled"
pub const FREE: usize = 0;
/// Room index meaning "no room"
pub const NO_ROOM: usize = 0;

/// Errors raised while building or solving a timetable model
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration: unknown labels, missing quotas, unresolvable rules
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The solving engine finished with a status other than OPTIMAL, FEASIBLE or INFEASIBLE
    #[error("Solving engine failed with status {0}")]
    Engine(cp::Status),
    /// The constraint model was used in a way the engine does not support
    #[error("Invalid model: {0}")]
    Model(String),
}

/// Build a complete session from a configuration: resolve the catalog, create the variables and quota constraints
/// and apply all rules of the configuration.
pub fn build_session(config: &io::config::Configuration) -> Result<Session, Error> {
    let catalog = Catalog::from_config(config)?;
    let rules = rules::RuleSet::resolve(config, &catalog)?;
    let mut session = Session::new(catalog)?;
    rules::apply(&mut session, &rules)?;
    Ok(session)
}

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

//! Solving a sealed session and extracting the timetable from the solution

use crate::catalog::Catalog;
use crate::cp::{IntVar, Solution, Solver, Status};
use crate::rules::lunch::LunchAllocation;
use crate::session::Session;
use crate::Error;
use log::{info, warn};
use ndarray::Array3;

/// A solved timetable: subject and room per (class, day, slot)
#[derive(Clone, Debug)]
pub struct Timetable {
    catalog: Catalog,
    status: Status,
    objective: Option<i64>,
    lessons: Array3<usize>,
    rooms: Array3<usize>,
    lunch: Option<LunchAllocation>,
}

impl Timetable {
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// `Status::Optimal` or `Status::Feasible` (if the search was stopped by a limit)
    pub fn status(&self) -> Status {
        self.status
    }

    /// Total penalty of the timetable, if the model had soft constraints
    pub fn objective(&self) -> Option<i64> {
        self.objective
    }

    /// Subject index of the class at (day, slot). `FREE` for no lesson.
    pub fn subject(&self, class: usize, day: usize, slot: usize) -> usize {
        self.lessons[[class, day, slot]]
    }

    /// Room index of the class at (day, slot). `NO_ROOM` for no room.
    pub fn room(&self, class: usize, day: usize, slot: usize) -> usize {
        self.rooms[[class, day, slot]]
    }

    pub fn lessons(&self) -> &Array3<usize> {
        &self.lessons
    }

    pub fn rooms(&self) -> &Array3<usize> {
        &self.rooms
    }

    pub fn lunch(&self) -> Option<&LunchAllocation> {
        self.lunch.as_ref()
    }
}

/// Result of a successful solver run
#[derive(Debug)]
pub enum SolveOutcome {
    Solved(Timetable),
    /// The hard constraints admit no timetable
    Infeasible,
}

fn extract(solution: &Solution, vars: &Array3<IntVar>) -> Result<Array3<usize>, Error> {
    let mut result = Array3::zeros(vars.dim());
    for (value, var) in result.iter_mut().zip(vars.iter()) {
        *value = solution
            .value(*var)
            .ok_or_else(|| Error::Model(format!("No value for variable {:?} in solution", var)))?
            as usize;
    }
    Ok(result)
}

/// Seal the session, solve its model and extract the timetable.
///
/// # Errors
///
/// Fails with `Error::Engine` if the solver finishes with a status other than OPTIMAL, FEASIBLE or INFEASIBLE and with
/// `Error::Model` if the model cannot be sealed.
pub fn solve<S: Solver + ?Sized>(session: Session, solver: &S) -> Result<SolveOutcome, Error> {
    let sealed = session.seal()?;
    let solution = solver.solve(&sealed.model);
    info!(
        "Solver finished with status {} after {} nodes",
        solution.status, solution.nodes
    );
    match solution.status {
        Status::Optimal | Status::Feasible => {
            if solution.status == Status::Feasible {
                warn!("The search was stopped by a limit. The timetable may not be optimal.");
            }
            let lessons = extract(&solution, &sealed.lessons)?;
            let rooms = extract(&solution, &sealed.rooms)?;
            Ok(SolveOutcome::Solved(Timetable {
                catalog: sealed.catalog,
                status: solution.status,
                objective: solution.objective,
                lessons,
                rooms,
                lunch: sealed.lunch,
            }))
        }
        Status::Infeasible => Ok(SolveOutcome::Infeasible),
        status => Err(Error::Engine(status)),
    }
}

#[cfg(test)]
mod tests {
    use crate::cp::{Model, SearchSolver, Solution, Solver, SolverConfig, Status};
    use crate::testing;
    use crate::{Error, SolveOutcome, FREE};

    /// A solver, which gives up immediately
    struct FailingSolver;

    impl Solver for FailingSolver {
        fn solve(&self, _model: &Model) -> Solution {
            Solution::empty(Status::ModelInvalid, 0)
        }
    }

    #[test]
    fn engine_error() {
        let session = testing::simple_session();
        match crate::solve(session, &FailingSolver) {
            Err(Error::Engine(Status::ModelInvalid)) => (),
            x => panic!("Expected engine error, got {:?}", x),
        }
    }

    #[test]
    fn node_limit_without_solution() {
        let session = testing::simple_session();
        let solver = SearchSolver::new(SolverConfig {
            num_threads: 1,
            node_limit: Some(1),
            time_limit: None,
        });
        assert!(matches!(crate::solve(session, &solver), Err(Error::Engine(Status::Unknown))));
    }

    #[test]
    fn quotas_are_exact() {
        let timetable = testing::solve_feasible(&testing::tiny_config());
        let catalog = timetable.catalog();
        for class in 0..2 {
            let mut counts = [0; 4];
            for day in 0..2 {
                for slot in 0..4 {
                    counts[timetable.subject(class, day, slot)] += 1;
                }
            }
            assert_eq!(counts[FREE], 4);
            assert_eq!(counts[catalog.subject("A").unwrap()], 2);
            assert_eq!(counts[catalog.subject("B").unwrap()], 2);
            // "C" has no quota for the level, so it is never scheduled
            assert_eq!(counts[catalog.subject("C").unwrap()], 0);
        }
    }

    #[test]
    fn solve_simple_config() {
        let timetable = testing::solve_feasible(&testing::simple_config());
        assert_eq!(timetable.status(), Status::Optimal);
        assert_eq!(timetable.objective(), Some(0));
        let catalog = timetable.catalog().clone();
        let subject = |name: &str| catalog.subject(name).unwrap();
        let l6 = catalog.level("6e").unwrap();

        // Quotas
        for class in catalog.classes.iter() {
            for (subject, quota) in catalog.levels[class.level].quotas.iter() {
                let count = timetable
                    .lessons()
                    .index_axis(ndarray::Axis(0), class.index)
                    .iter()
                    .filter(|s| *s == subject)
                    .count();
                assert_eq!(count as u32, *quota, "Quota of {} in {}", catalog.subject_name(*subject), class.name);
            }
        }

        // Fixed lesson and room
        assert_eq!(timetable.subject(1, 0, 1), subject("Histoire"));
        assert_eq!(timetable.room(1, 0, 1), catalog.room("S2").unwrap());

        // T_MATH is unavailable on Lundi 8h
        for class in 0..3 {
            assert_ne!(timetable.subject(class, 0, 0), subject("Maths"));
        }

        // EPS only in slots with the gymnasium available
        for class in 0..3 {
            for slot in [0, 1] {
                assert_ne!(timetable.subject(class, 1, slot), subject("EPS"));
            }
        }

        // Lunch at 12h for everybody
        for class in 0..3 {
            for day in 0..2 {
                assert_eq!(timetable.subject(class, day, 4), FREE);
            }
        }
        assert_eq!(timetable.lunch().unwrap().slots, vec![4, 4, 4]);

        // 6e EPS in lock-step
        for day in 0..2 {
            for slot in 0..6 {
                assert_eq!(
                    timetable.subject(0, day, slot) == subject("EPS"),
                    timetable.subject(1, day, slot) == subject("EPS")
                );
            }
        }

        // Latin targeted at Mardi 13h
        assert_eq!(timetable.subject(2, 1, 5), subject("Latin"));

        // Maths at most once a day for 6e, never directly after EPS
        for class in catalog.classes_of_level(l6) {
            for day in 0..2 {
                let maths = (0..6).filter(|s| timetable.subject(class, day, *s) == subject("Maths")).count();
                assert!(maths <= 1);
            }
        }
        for class in 0..3 {
            for day in 0..2 {
                for slot in 0..5 {
                    assert!(
                        !(timetable.subject(class, day, slot) == subject("EPS")
                            && timetable.subject(class, day, slot + 1) == subject("Maths"))
                    );
                }
            }
        }

        // Maths is taught by a single teacher
        for day in 0..2 {
            for slot in 0..6 {
                let maths = (0..3).filter(|c| timetable.subject(*c, day, slot) == subject("Maths")).count();
                assert!(maths <= 1);
            }
        }
    }

    #[test]
    fn infeasible_outcome() {
        let mut config = testing::tiny_config();
        config.quotas.get_mut("L1").unwrap().insert("C".to_owned(), 5);
        assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));
    }
}

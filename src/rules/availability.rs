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

//! Unavailability of teachers and rooms

use crate::catalog::Catalog;
use crate::io::config;
use crate::session::Session;
use crate::Error;
use log::debug;

/// A teacher or room (by index) is unavailable at some slots of a day
#[derive(Clone, Debug, PartialEq)]
pub struct Unavailability {
    /// Teacher index or room index (1-based)
    pub who: usize,
    pub day: usize,
    pub slots: Vec<usize>,
}

impl Unavailability {
    pub fn resolve_teacher(u: &config::Unavailability, catalog: &Catalog) -> Result<Self, Error> {
        Ok(Unavailability {
            who: catalog.teacher(&u.who)?,
            day: catalog.day(&u.day)?,
            slots: catalog.slots(&u.slots)?,
        })
    }

    pub fn resolve_room(u: &config::Unavailability, catalog: &Catalog) -> Result<Self, Error> {
        Ok(Unavailability {
            who: catalog.room(&u.who)?,
            day: catalog.day(&u.day)?,
            slots: catalog.slots(&u.slots)?,
        })
    }
}

/// Forbid every subject the teacher gives to a class (at the class' level) at the unavailable slots
pub fn forbid_teacher(session: &mut Session, unavailability: &Unavailability) {
    let assignments = session.catalog().teacher_map.assignments(unavailability.who);
    let mut forbidden = 0;
    for (level, subject) in assignments {
        for class in session.catalog().classes_of_level(level) {
            for slot in unavailability.slots.iter() {
                let var = session.lesson(class, unavailability.day, *slot);
                session.forbid(var, subject as i64);
                forbidden += 1;
            }
        }
    }
    debug!(
        "Teacher {} unavailable: forbade {} lessons",
        session.catalog().teachers[unavailability.who],
        forbidden
    );
}

/// Forbid every subject bound to the room, as well as the room itself, at the unavailable slots
pub fn forbid_room(session: &mut Session, unavailability: &Unavailability) {
    let room = unavailability.who;
    let subjects: Vec<usize> = session
        .catalog()
        .subject_rooms
        .iter()
        .filter(|(_, rooms)| rooms.contains(&room))
        .map(|(subject, _)| *subject)
        .collect();
    for class in 0..session.catalog().classes.len() {
        let allowed: Vec<usize> = session.catalog().allowed_subjects(class).collect();
        for slot in unavailability.slots.iter() {
            for subject in subjects.iter().filter(|s| allowed.contains(s)) {
                let var = session.lesson(class, unavailability.day, *slot);
                session.forbid(var, *subject as i64);
            }
            let var = session.room(class, unavailability.day, *slot);
            session.forbid(var, room as i64);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::Unavailability;
    use crate::testing;

    #[test]
    fn teacher_unavailable() {
        let mut config = testing::tiny_config();
        config.teacher_unavailability.push(Unavailability {
            who: "TA".to_owned(),
            day: "D1".to_owned(),
            slots: vec!["S1".to_owned(), "S2".to_owned(), "S4".to_owned()],
        });
        let timetable = testing::solve_feasible(&config);
        let a = timetable.catalog().subject("A").unwrap();
        for class in 0..2 {
            for slot in [0, 1, 3] {
                assert_ne!(timetable.subject(class, 0, slot), a);
            }
        }
    }

    #[test]
    fn teacher_unavailable_all_week() {
        let mut config = testing::tiny_config();
        for day in ["D1", "D2"] {
            config.teacher_unavailability.push(Unavailability {
                who: "TB".to_owned(),
                day: day.to_owned(),
                slots: vec!["S1".to_owned(), "S2".to_owned(), "S3".to_owned(), "S4".to_owned()],
            });
        }
        assert!(matches!(testing::solve(&config), crate::SolveOutcome::Infeasible));
    }

    #[test]
    fn room_unavailable() {
        let mut config = testing::tiny_config();
        config.subject_rooms.insert("B".to_owned(), vec!["R2".to_owned()]);
        config.room_unavailability.push(Unavailability {
            who: "R2".to_owned(),
            day: "D1".to_owned(),
            slots: vec!["S1".to_owned(), "S2".to_owned(), "S3".to_owned(), "S4".to_owned()],
        });
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        let r2 = timetable.catalog().room("R2").unwrap();
        for class in 0..2 {
            for slot in 0..4 {
                assert_ne!(timetable.subject(class, 0, slot), b);
                assert_ne!(timetable.room(class, 0, slot), r2);
            }
        }
    }

    #[test]
    fn unknown_teacher() {
        let mut config = testing::tiny_config();
        config.teacher_unavailability.push(Unavailability {
            who: "TX".to_owned(),
            day: "D1".to_owned(),
            slots: vec!["S1".to_owned()],
        });
        let catalog = crate::Catalog::from_config(&config).unwrap();
        assert!(crate::rules::RuleSet::resolve(&config, &catalog).is_err());
    }
}

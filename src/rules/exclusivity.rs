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

//! Room and teacher double-booking constraints

use crate::cp::{Comparison, LinearExpr};
use crate::session::Session;
use log::debug;

/// At every slot, each room is used by at most one class
pub fn add_room_exclusivity(session: &mut Session) {
    let num_classes = session.catalog().classes.len();
    let num_rooms = session.catalog().rooms.len();
    if num_classes < 2 {
        return;
    }
    for day in 0..session.catalog().grid.num_days() {
        for slot in 0..session.catalog().grid.num_slots() {
            for room in 1..=num_rooms {
                let users: Vec<_> = (0..num_classes)
                    .map(|class| session.uses_room(class, day, slot, room))
                    .collect();
                session
                    .model_mut()
                    .add_linear(LinearExpr::count(users), Comparison::LessEqual, 1);
            }
        }
    }
}

/// At every slot, each teacher gives at most one lesson.
///
/// Lessons of synchronized (level, subject) pairs are given to all classes of the level at once and are not counted.
/// The constraints are added when the session is sealed, when all synchronized pairs are known.
pub fn add_teacher_exclusivity(session: &mut Session) {
    session.require_teacher_exclusivity();
}

pub(crate) fn compile_teacher_exclusivity(session: &mut Session) {
    let mut constraints = 0;
    for teacher in 0..session.catalog().teachers.len() {
        let assignments = session.catalog().teacher_map.assignments(teacher);
        for day in 0..session.catalog().grid.num_days() {
            for slot in 0..session.catalog().grid.num_slots() {
                let mut lessons = Vec::new();
                for (level, subject) in assignments.iter() {
                    if session.is_synchronized(*level, *subject) {
                        continue;
                    }
                    for class in session.catalog().classes_of_level(*level) {
                        lessons.push(session.has_subject(class, day, slot, *subject));
                    }
                }
                if lessons.len() > 1 {
                    session
                        .model_mut()
                        .add_linear(LinearExpr::count(lessons), Comparison::LessEqual, 1);
                    constraints += 1;
                }
            }
        }
    }
    debug!("Added {} teacher double-booking constraints", constraints);
}

#[cfg(test)]
mod tests {
    use crate::io::config::{ClassConfig, FixedLesson, SyncRequest, TeacherReference};
    use crate::testing;
    use crate::SolveOutcome;

    fn fixed(class: &str, subject: Option<&str>, room: Option<&str>) -> FixedLesson {
        FixedLesson {
            class: class.to_owned(),
            day: "D1".to_owned(),
            slot: "S2".to_owned(),
            subject: subject.map(|s| s.to_owned()),
            room: room.map(|s| s.to_owned()),
        }
    }

    #[test]
    fn room_conflict_is_infeasible() {
        let mut config = testing::tiny_config();
        config.fixed.push(fixed("L1a", None, Some("R1")));
        config.fixed.push(fixed("L1b", None, Some("R1")));
        assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));

        config.room_exclusivity = false;
        let timetable = testing::solve_feasible(&config);
        assert_eq!(timetable.room(0, 0, 1), timetable.room(1, 0, 1));
    }

    #[test]
    fn rooms_are_exclusive() {
        let mut config = testing::tiny_config();
        config.fixed.push(fixed("L1a", None, Some("R2")));
        let timetable = testing::solve_feasible(&config);
        assert_eq!(timetable.room(0, 0, 1), 2);
        assert_ne!(timetable.room(1, 0, 1), 2);
    }

    #[test]
    fn teacher_conflict_is_infeasible() {
        let mut config = testing::tiny_config();
        config.fixed.push(fixed("L1a", Some("A"), None));
        config.fixed.push(fixed("L1b", Some("A"), None));
        assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));

        config.teacher_exclusivity = false;
        let timetable = testing::solve_feasible(&config);
        assert_eq!(timetable.subject(0, 0, 1), timetable.subject(1, 0, 1));
    }

    #[test]
    fn teacher_lessons_do_not_overlap() {
        let timetable = testing::solve_feasible(&testing::tiny_config());
        for day in 0..2 {
            for slot in 0..4 {
                let a = timetable.subject(0, day, slot);
                if a != crate::FREE {
                    assert_ne!(a, timetable.subject(1, day, slot));
                }
            }
        }
    }

    #[test]
    fn synchronized_lessons_are_exempt() {
        let mut config = testing::tiny_config();
        config.synchronized.push(SyncRequest {
            level: "L1".to_owned(),
            subject: "A".to_owned(),
        });
        config.fixed.push(fixed("L1a", Some("A"), None));
        let timetable = testing::solve_feasible(&config);
        assert_eq!(timetable.subject(1, 0, 1), timetable.catalog().subject("A").unwrap());
    }

    #[test]
    fn synchronized_lesson_besides_other_lesson() {
        // TA teaches the synchronized A of level L1 and C of level L2
        let mut config = testing::tiny_config();
        config.quotas.insert("L2".to_owned(), [("C".to_owned(), 1)].into_iter().collect());
        config
            .teachers
            .insert("C".to_owned(), TeacherReference::Single("TA".to_owned()));
        config.classes.push(ClassConfig {
            name: "L2a".to_owned(),
            capacity: 25,
            level: None,
            subgroups: vec![],
        });
        config.synchronized.push(SyncRequest {
            level: "L1".to_owned(),
            subject: "A".to_owned(),
        });
        config.fixed.push(fixed("L1a", Some("A"), None));
        config.fixed.push(fixed("L2a", Some("C"), None));
        let timetable = testing::solve_feasible(&config);
        let a = timetable.catalog().subject("A").unwrap();
        assert_eq!(timetable.subject(1, 0, 1), a);
        assert_eq!(timetable.subject(2, 0, 1), timetable.catalog().subject("C").unwrap());
    }

    #[test]
    fn unsynchronized_lesson_conflicts_with_other_level() {
        let mut config = testing::tiny_config();
        config.quotas.insert("L2".to_owned(), [("C".to_owned(), 1)].into_iter().collect());
        config
            .teachers
            .insert("C".to_owned(), TeacherReference::Single("TA".to_owned()));
        config.classes.push(ClassConfig {
            name: "L2a".to_owned(),
            capacity: 25,
            level: None,
            subgroups: vec![],
        });
        config.fixed.push(fixed("L1a", Some("A"), None));
        config.fixed.push(fixed("L2a", Some("C"), None));
        assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));
    }
}

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

//! Linkage between a class' lesson and its room

use crate::cp::Literal;
use crate::session::Session;
use crate::{FREE, NO_ROOM};

/// Tie the room variables to the lessons: a class uses a room exactly when it has a lesson, and lessons of subjects
/// with suitable rooms take place in one of these rooms.
pub fn link_rooms(session: &mut Session) {
    let num_days = session.catalog().grid.num_days();
    let num_slots = session.catalog().grid.num_slots();
    for class in 0..session.catalog().classes.len() {
        let bound_subjects: Vec<(usize, Vec<usize>)> = session
            .catalog()
            .allowed_subjects(class)
            .filter_map(|s| session.catalog().subject_rooms.get(&s).map(|rooms| (s, rooms.clone())))
            .collect();
        for day in 0..num_days {
            for slot in 0..num_slots {
                let free = session.has_subject(class, day, slot, FREE);
                let no_room = session.uses_room(class, day, slot, NO_ROOM);
                session.model_mut().add_implication(free.into(), no_room.into());
                session.model_mut().add_implication(no_room.into(), free.into());

                for (subject, rooms) in bound_subjects.iter() {
                    let mut clause: Vec<Literal> = vec![session.has_subject(class, day, slot, *subject).negated()];
                    for room in rooms.iter() {
                        clause.push(session.uses_room(class, day, slot, *room).into());
                    }
                    session.model_mut().add_clause(clause);
                }
            }
        }
    }
}

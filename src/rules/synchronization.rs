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

//! Lock-step scheduling of a subject across all classes of a level

use crate::cp::{Comparison, LinearExpr};
use crate::session::Session;
use crate::Error;
use log::debug;

/// Schedule `subject` at the same slots for all classes of `level`.
///
/// One shared indicator per (day, slot) is tied to each class' "has subject" indicator, so at every slot either all
/// classes or none of them have the subject. The number of shared slots equals the level's quota of the subject.
///
/// # Errors
///
/// Fails with `Error::Configuration` if the level has less than two classes.
pub fn synchronize(session: &mut Session, level: usize, subject: usize) -> Result<(), Error> {
    if session.is_synchronized(level, subject) {
        return Ok(());
    }
    let classes = session.catalog().classes_of_level(level);
    if classes.len() < 2 {
        return Err(Error::Configuration(format!(
            "Synchronizing {} requires at least two classes of level {}",
            session.catalog().subject_name(subject),
            session.catalog().levels[level].name
        )));
    }
    let num_days = session.catalog().grid.num_days();
    let num_slots = session.catalog().grid.num_slots();
    let mut shared = Vec::with_capacity(num_days * num_slots);
    for day in 0..num_days {
        for slot in 0..num_slots {
            let name = format!(
                "sync {}/{}/{}/{}",
                session.catalog().levels[level].name,
                session.catalog().subject_name(subject),
                day,
                slot
            );
            let y = session.model_mut().new_bool_var(name);
            for class in classes.iter() {
                let b = session.has_subject(*class, day, slot, subject);
                session.model_mut().add_implication(y.into(), b.into());
                session.model_mut().add_implication(b.into(), y.into());
            }
            shared.push(y);
        }
    }
    let quota = session.catalog().quota(level, subject);
    session
        .model_mut()
        .add_linear(LinearExpr::count(shared.iter().copied()), Comparison::Equal, quota as i64);
    session.mark_synchronized(level, subject);
    debug!(
        "Synchronized {} for {} classes of level {}",
        session.catalog().subject_name(subject),
        classes.len(),
        session.catalog().levels[level].name
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::io::config::SyncRequest;
    use crate::testing;
    use crate::Error;

    #[test]
    fn lock_step() {
        let mut config = testing::tiny_config();
        config.synchronized.push(SyncRequest {
            level: "L1".to_owned(),
            subject: "B".to_owned(),
        });
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        let mut shared = 0;
        for day in 0..2 {
            for slot in 0..4 {
                let first = timetable.subject(0, day, slot) == b;
                assert_eq!(first, timetable.subject(1, day, slot) == b);
                if first {
                    shared += 1;
                }
            }
        }
        assert_eq!(shared, 2);
    }

    #[test]
    fn single_class_level() {
        let mut config = testing::tiny_config();
        config.classes.pop();
        config.synchronized.push(SyncRequest {
            level: "L1".to_owned(),
            subject: "B".to_owned(),
        });
        assert!(matches!(crate::build_session(&config), Err(Error::Configuration(_))));
    }

    #[test]
    fn unknown_level() {
        let mut config = testing::tiny_config();
        config.synchronized.push(SyncRequest {
            level: "L2".to_owned(),
            subject: "B".to_owned(),
        });
        assert!(matches!(crate::build_session(&config), Err(Error::Configuration(_))));
    }
}

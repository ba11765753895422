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

//! The model building context of a single timetable problem.
//!
//! A `Session` owns everything the rule modules need to add constraints: the resolved `Catalog`, the constraint
//! `Model`, the lesson and room variables per (class, day, slot), the penalty terms of the objective and the
//! bookkeeping of synchronized (level, subject) pairs. Sessions share no state, so independent sessions may be built
//! and solved concurrently.

use crate::catalog::Catalog;
use crate::cp::{BoolVar, Comparison, IntVar, LinearExpr, Model};
use crate::objective::PenaltyAccumulator;
use crate::rules::lunch::LunchAllocation;
use crate::{Error, FREE, NO_ROOM};
use log::{debug, info, warn};
use ndarray::Array3;
use std::collections::{BTreeSet, HashMap};

pub struct Session {
    catalog: Catalog,
    model: Model,
    /// Subject variable per (class, day, slot)
    lessons: Array3<IntVar>,
    /// Room variable per (class, day, slot)
    rooms: Array3<IntVar>,
    /// Equality indicators created so far, by (variable index, value)
    indicators: HashMap<(usize, i64), BoolVar>,
    penalties: PenaltyAccumulator,
    /// Synchronized (level, subject) pairs
    synchronized: BTreeSet<(usize, usize)>,
    /// Lessons already required by targeted rules, by (class, sorted subjects)
    targeted: HashMap<(usize, Vec<usize>), u32>,
    teacher_exclusivity: bool,
    lunch: Option<LunchAllocation>,
}

/// The final model of a session together with the information to interpret its solution
pub struct SealedSession {
    pub catalog: Catalog,
    pub model: Model,
    pub lessons: Array3<IntVar>,
    pub rooms: Array3<IntVar>,
    pub lunch: Option<LunchAllocation>,
}

impl Session {
    /// Create the lesson and room variables for all classes, days and slots of the catalog and add the weekly quota
    /// constraints.
    ///
    /// Each lesson variable's domain consists of `FREE` and the subjects allowed for the class' level. For every
    /// allowed subject, the number of slots with this subject equals the level's quota. Additionally, the number of
    /// free slots of each class is fixed to the remaining number of slots, which fails early for overfull quotas.
    pub fn new(catalog: Catalog) -> Result<Session, Error> {
        let num_classes = catalog.classes.len();
        let num_days = catalog.grid.num_days();
        let num_slots = catalog.grid.num_slots();
        let mut model = Model::new();

        let mut lessons = Vec::with_capacity(num_classes * num_days * num_slots);
        for class in catalog.classes.iter() {
            let domain: Vec<i64> = std::iter::once(FREE as i64)
                .chain(catalog.allowed_subjects(class.index).map(|s| s as i64))
                .collect();
            for day in catalog.grid.days.iter() {
                for slot in catalog.grid.slots.iter() {
                    lessons.push(model.new_int_var(domain.clone(), format!("{}/{}/{}", class.name, day, slot))?);
                }
            }
        }
        let mut rooms = Vec::with_capacity(lessons.len());
        for class in catalog.classes.iter() {
            for day in catalog.grid.days.iter() {
                for slot in catalog.grid.slots.iter() {
                    rooms.push(model.new_int_var(
                        NO_ROOM as i64..=catalog.rooms.len() as i64,
                        format!("room {}/{}/{}", class.name, day, slot),
                    )?);
                }
            }
        }
        let shape = (num_classes, num_days, num_slots);
        let lessons = Array3::from_shape_vec(shape, lessons).map_err(|e| Error::Model(e.to_string()))?;
        let rooms = Array3::from_shape_vec(shape, rooms).map_err(|e| Error::Model(e.to_string()))?;

        let mut session = Session {
            catalog,
            model,
            lessons,
            rooms,
            indicators: HashMap::new(),
            penalties: PenaltyAccumulator::new(),
            synchronized: BTreeSet::new(),
            targeted: HashMap::new(),
            teacher_exclusivity: false,
            lunch: None,
        };
        session.add_quotas();
        info!(
            "Created session with {} lesson variables for {} classes",
            session.lessons.len(),
            num_classes
        );
        Ok(session)
    }

    fn add_quotas(&mut self) {
        let total_slots = (self.catalog.grid.num_days() * self.catalog.grid.num_slots()) as i64;
        for class in 0..self.catalog.classes.len() {
            let level = self.catalog.classes[class].level;
            let quotas: Vec<(usize, u32)> = self.catalog.levels[level]
                .quotas
                .iter()
                .map(|(s, q)| (*s, *q))
                .collect();
            let mut planned = 0i64;
            for (subject, quota) in quotas {
                let count = self.count_in_week(class, subject);
                self.model.add_linear(count, Comparison::Equal, quota as i64);
                planned += quota as i64;
            }
            let free = self.count_in_week(class, FREE);
            self.model.add_linear(free, Comparison::Equal, total_slots - planned);
            if planned > total_slots {
                warn!(
                    "Class {} has {} planned lessons but only {} slots",
                    self.catalog.classes[class].name, planned, total_slots
                );
            }
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Direct access to the model for rule modules
    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    pub fn lesson(&self, class: usize, day: usize, slot: usize) -> IntVar {
        self.lessons[[class, day, slot]]
    }

    pub fn room(&self, class: usize, day: usize, slot: usize) -> IntVar {
        self.rooms[[class, day, slot]]
    }

    /// Get the indicator `b ⇔ var == value`.
    ///
    /// Indicators are created on first use and shared by all constraints testing the same equality.
    pub fn indicator(&mut self, var: IntVar, value: i64) -> BoolVar {
        if let Some(b) = self.indicators.get(&(var.index(), value)) {
            return *b;
        }
        let name = format!("[{} == {}]", self.model.name(var), value);
        let b = self.model.new_bool_var(name);
        self.model.add_reified_equal(b, var, value);
        self.indicators.insert((var.index(), value), b);
        b
    }

    /// Indicator "class has `subject` at (day, slot)"
    pub fn has_subject(&mut self, class: usize, day: usize, slot: usize, subject: usize) -> BoolVar {
        let var = self.lesson(class, day, slot);
        self.indicator(var, subject as i64)
    }

    /// Indicator "class uses `room` at (day, slot)"
    pub fn uses_room(&mut self, class: usize, day: usize, slot: usize, room: usize) -> BoolVar {
        let var = self.room(class, day, slot);
        self.indicator(var, room as i64)
    }

    /// Number of slots of the given day and slot range, at which the class has one of the subjects
    pub fn count_in_slots<I>(&mut self, class: usize, day: usize, slots: I, subjects: &[usize]) -> LinearExpr
    where
        I: IntoIterator<Item = usize>,
    {
        let mut indicators = Vec::new();
        for slot in slots {
            for subject in subjects.iter() {
                indicators.push(self.has_subject(class, day, slot, *subject));
            }
        }
        LinearExpr::count(indicators)
    }

    /// Number of slots of the whole week, at which the class has the subject
    pub fn count_in_week(&mut self, class: usize, subject: usize) -> LinearExpr {
        let mut indicators = Vec::new();
        for day in 0..self.catalog.grid.num_days() {
            for slot in 0..self.catalog.grid.num_slots() {
                indicators.push(self.has_subject(class, day, slot, subject));
            }
        }
        LinearExpr::count(indicators)
    }

    /// Pin the subject of a class at (day, slot)
    pub fn fix_lesson(&mut self, class: usize, day: usize, slot: usize, subject: usize) {
        let var = self.lesson(class, day, slot);
        self.model.fix(var, subject as i64);
    }

    /// Pin the room of a class at (day, slot)
    pub fn fix_room(&mut self, class: usize, day: usize, slot: usize, room: usize) {
        let var = self.room(class, day, slot);
        self.model.fix(var, room as i64);
    }

    /// Forbid `var == value` by fixing the equality indicator to false
    pub fn forbid(&mut self, var: IntVar, value: i64) {
        let b = self.indicator(var, value);
        self.model.add_clause(vec![b.negated()]);
    }

    pub fn penalties_mut(&mut self) -> &mut PenaltyAccumulator {
        &mut self.penalties
    }

    pub(crate) fn mark_synchronized(&mut self, level: usize, subject: usize) {
        self.synchronized.insert((level, subject));
    }

    pub fn is_synchronized(&self, level: usize, subject: usize) -> bool {
        self.synchronized.contains(&(level, subject))
    }

    /// Record `amount` lessons of `subjects` required for `class` by a targeted rule
    pub(crate) fn reserve_targeted(&mut self, class: usize, subjects: &[usize], amount: u32) {
        let mut key = subjects.to_vec();
        key.sort_unstable();
        key.dedup();
        *self.targeted.entry((class, key)).or_insert(0) += amount;
    }

    /// Number of lessons of `subjects` already required for `class` by targeted rules
    pub(crate) fn targeted_lessons(&self, class: usize, subjects: &[usize]) -> u32 {
        let mut key = subjects.to_vec();
        key.sort_unstable();
        key.dedup();
        self.targeted.get(&(class, key)).copied().unwrap_or(0)
    }

    /// Request teacher double-booking constraints. They are compiled when the session is sealed, when all
    /// synchronized pairs are known.
    pub(crate) fn require_teacher_exclusivity(&mut self) {
        self.teacher_exclusivity = true;
    }

    pub(crate) fn set_lunch(&mut self, allocation: LunchAllocation) {
        self.lunch = Some(allocation);
    }

    pub fn lunch(&self) -> Option<&LunchAllocation> {
        self.lunch.as_ref()
    }

    /// Finish model construction: add the deferred constraints and set the objective function from the collected
    /// penalty terms.
    pub fn seal(mut self) -> Result<SealedSession, Error> {
        if self.teacher_exclusivity {
            crate::rules::exclusivity::compile_teacher_exclusivity(&mut self);
        }
        let penalties = std::mem::take(&mut self.penalties);
        if let Some(objective) = penalties.compile() {
            debug!("Minimizing {} penalty terms", objective.terms.len());
            self.model.minimize(objective)?;
        }
        info!(
            "Sealed model with {} variables and {} constraints",
            self.model.num_vars(),
            self.model.num_constraints()
        );
        Ok(SealedSession {
            catalog: self.catalog,
            model: self.model,
            lessons: self.lessons,
            rooms: self.rooms,
            lunch: self.lunch,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::testing;
    use crate::FREE;

    #[test]
    fn create_variables() {
        let session = testing::simple_session();
        let catalog = session.catalog();
        assert_eq!(session.lessons.dim(), (3, 2, 6));
        assert_eq!(session.rooms.dim(), (3, 2, 6));

        // 6eA may only have the 6e subjects
        let domain = session.model().domain(session.lesson(0, 0, 0));
        let latin = catalog.subject("Latin").unwrap() as i64;
        assert!(domain.contains(FREE as i64));
        assert!(!domain.contains(latin));
        assert!(session.model().domain(session.lesson(2, 0, 0)).contains(latin));
        assert_eq!(session.model().domain(session.room(0, 1, 5)).max(), 3);
    }

    #[test]
    fn indicators_are_shared() {
        let mut session = testing::simple_session();
        let a = session.has_subject(0, 1, 2, 1);
        let b = session.has_subject(0, 1, 2, 1);
        let c = session.has_subject(0, 1, 2, 2);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn overfull_quota_is_infeasible() {
        let mut config = testing::simple_config();
        config.quotas.get_mut("6e").unwrap().insert("Maths".to_owned(), 20);
        let session = crate::build_session(&config).unwrap();
        let result = crate::solve(session, &testing::solver()).unwrap();
        assert!(matches!(result, crate::SolveOutcome::Infeasible));
    }
}

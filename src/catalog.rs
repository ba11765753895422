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

//! Resolved lookup tables of a timetable problem.
//!
//! All labels of the configuration are resolved to indexes exactly once, here. Unknown or duplicate labels are
//! reported as `Error::Configuration` instead of silently matching some other entity.

use crate::cp::Domain;
use crate::io::config::{ClassFilter, Configuration, TeacherReference};
use crate::Error;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;

/// Days and slots of the timetable
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    pub days: Vec<String>,
    pub slots: Vec<String>,
    /// Slot between morning and afternoon, counted to neither of them
    pub lunch_boundary: usize,
}

impl TimeGrid {
    pub fn num_days(&self) -> usize {
        self.days.len()
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Slot indexes before the lunch boundary
    pub fn morning(&self) -> Range<usize> {
        0..self.lunch_boundary.min(self.num_slots())
    }

    /// Slot indexes after the lunch boundary
    pub fn afternoon(&self) -> Range<usize> {
        (self.lunch_boundary + 1).min(self.num_slots())..self.num_slots()
    }
}

/// A school level with its weekly quotas
#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    /// id/index of the Level in the list of levels
    pub index: usize,
    pub name: String,
    /// Weekly hours per subject index. The keys are the subjects allowed for the level's classes.
    pub quotas: BTreeMap<usize, u32>,
}

/// Part of a class which does not attend some of the class' subjects
#[derive(Clone, Debug, PartialEq)]
pub struct Subgroup {
    pub name: String,
    pub skipped_subjects: Vec<usize>,
}

/// Representation of a class
#[derive(Clone, Debug, PartialEq)]
pub struct ClassEntity {
    /// id/index of the class in the list of classes
    pub index: usize,
    pub name: String,
    /// Index of the class' level
    pub level: usize,
    /// Number of students
    pub capacity: u32,
    pub subgroups: Vec<Subgroup>,
}

/// Normalized teacher references: subject → level → ordered set of teacher indexes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TeacherMap {
    by_subject: BTreeMap<usize, BTreeMap<usize, BTreeSet<usize>>>,
}

impl TeacherMap {
    fn insert(&mut self, subject: usize, level: usize, teacher: usize) {
        self.by_subject
            .entry(subject)
            .or_default()
            .entry(level)
            .or_default()
            .insert(teacher);
    }

    /// Teachers who may teach `subject` at `level`
    pub fn teachers(&self, subject: usize, level: usize) -> impl Iterator<Item = usize> + '_ {
        self.by_subject
            .get(&subject)
            .and_then(|levels| levels.get(&level))
            .into_iter()
            .flat_map(|teachers| teachers.iter().copied())
    }

    pub fn covers(&self, teacher: usize, subject: usize, level: usize) -> bool {
        self.by_subject
            .get(&subject)
            .and_then(|levels| levels.get(&level))
            .map_or(false, |teachers| teachers.contains(&teacher))
    }

    /// All (level, subject) pairs the teacher may teach
    pub fn assignments(&self, teacher: usize) -> Vec<(usize, usize)> {
        let mut result = Vec::new();
        for (subject, levels) in self.by_subject.iter() {
            for (level, teachers) in levels.iter() {
                if teachers.contains(&teacher) {
                    result.push((*level, *subject));
                }
            }
        }
        result.sort_unstable();
        result
    }
}

/// All resolved entities of a timetable problem
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    pub grid: TimeGrid,
    /// Subject names. Subject index i+1 refers to `subjects[i]`.
    pub subjects: Vec<String>,
    pub levels: Vec<Level>,
    pub classes: Vec<ClassEntity>,
    /// Room names. Room index i+1 refers to `rooms[i]`.
    pub rooms: Vec<String>,
    /// Teacher ids, sorted
    pub teachers: Vec<String>,
    pub teacher_map: TeacherMap,
    /// Suitable room indexes per subject index. Subjects without entry may use any room.
    pub subject_rooms: BTreeMap<usize, Vec<usize>>,
}

fn find(labels: &[String], label: &str, kind: &str) -> Result<usize, Error> {
    labels
        .iter()
        .position(|l| l == label)
        .ok_or_else(|| Error::Configuration(format!("Unknown {} '{}'", kind, label)))
}

fn check_unique(labels: &[String], kind: &str) -> Result<(), Error> {
    let mut seen = BTreeSet::new();
    for l in labels.iter() {
        if !seen.insert(l.as_str()) {
            return Err(Error::Configuration(format!("Duplicate {} '{}'", kind, l)));
        }
    }
    Ok(())
}

/// Level name of a class without explicit level: the first two characters of its name
fn derive_level_name(class_name: &str) -> String {
    class_name.chars().take(2).collect()
}

impl Catalog {
    /// Resolve the entities of a configuration
    ///
    /// # Errors
    ///
    /// Fails with `Error::Configuration` if
    /// * any label list (days, slots, subjects, classes, rooms) contains duplicates
    /// * a quota, teacher reference or room compatibility refers to an unknown subject, level or room
    /// * a class' level has no quota entry
    /// * the grid has no days or slots
    pub fn from_config(config: &Configuration) -> Result<Catalog, Error> {
        if config.days.is_empty() || config.slots.is_empty() {
            return Err(Error::Configuration("The time grid needs at least one day and one slot".to_owned()));
        }
        check_unique(&config.days, "day")?;
        check_unique(&config.slots, "slot")?;
        check_unique(&config.subjects, "subject")?;
        check_unique(&config.rooms, "room")?;
        for (kind, count) in [("subjects", config.subjects.len()), ("rooms", config.rooms.len())] {
            if count as i64 > Domain::MAX_VALUE {
                return Err(Error::Configuration(format!(
                    "Too many {}: {} given, at most {} are supported",
                    kind,
                    count,
                    Domain::MAX_VALUE
                )));
            }
        }

        let grid = TimeGrid {
            days: config.days.clone(),
            slots: config.slots.clone(),
            lunch_boundary: config.lunch_boundary,
        };
        let subjects = config.subjects.clone();
        let subject_index = |name: &str| find(&subjects, name, "subject").map(|i| i + 1);

        // Levels and quotas
        let mut levels = Vec::new();
        for (index, (name, quotas)) in config.quotas.iter().enumerate() {
            let mut resolved = BTreeMap::new();
            for (subject, hours) in quotas.iter() {
                resolved.insert(subject_index(subject)?, *hours);
            }
            levels.push(Level {
                index,
                name: name.clone(),
                quotas: resolved,
            });
        }
        let level_names: Vec<String> = levels.iter().map(|l| l.name.clone()).collect();
        let level_index = |name: &str| find(&level_names, name, "level");

        // Classes
        let mut classes = Vec::new();
        for (index, c) in config.classes.iter().enumerate() {
            let level_name = c.level.clone().unwrap_or_else(|| derive_level_name(&c.name));
            let level = level_index(&level_name).map_err(|_| {
                Error::Configuration(format!(
                    "No quota entry for level '{}' of class '{}'",
                    level_name, c.name
                ))
            })?;
            let mut subgroups = Vec::new();
            for s in c.subgroups.iter() {
                subgroups.push(Subgroup {
                    name: s.name.clone(),
                    skipped_subjects: s
                        .skipped_subjects
                        .iter()
                        .map(|n| subject_index(n))
                        .collect::<Result<_, _>>()?,
                });
            }
            classes.push(ClassEntity {
                index,
                name: c.name.clone(),
                level,
                capacity: c.capacity,
                subgroups,
            });
        }
        let class_names: Vec<String> = classes.iter().map(|c| c.name.clone()).collect();
        check_unique(&class_names, "class")?;

        // Teachers: normalize the references into subject → level → teachers
        let mut teachers = BTreeSet::new();
        for reference in config.teachers.values() {
            match reference {
                TeacherReference::Single(t) => {
                    teachers.insert(t.clone());
                }
                TeacherReference::PerLevel(m) => teachers.extend(m.values().cloned()),
                TeacherReference::PerLevelList(m) => teachers.extend(m.values().flatten().cloned()),
            }
        }
        let teachers: Vec<String> = teachers.into_iter().collect();
        let mut teacher_map = TeacherMap::default();
        for (subject, reference) in config.teachers.iter() {
            let s = subject_index(subject)?;
            match reference {
                TeacherReference::Single(t) => {
                    let t = find(&teachers, t, "teacher")?;
                    for level in levels.iter() {
                        teacher_map.insert(s, level.index, t);
                    }
                }
                TeacherReference::PerLevel(m) => {
                    for (level, t) in m.iter() {
                        teacher_map.insert(s, level_index(level)?, find(&teachers, t, "teacher")?);
                    }
                }
                TeacherReference::PerLevelList(m) => {
                    for (level, ts) in m.iter() {
                        let level = level_index(level)?;
                        for t in ts.iter() {
                            teacher_map.insert(s, level, find(&teachers, t, "teacher")?);
                        }
                    }
                }
            }
        }

        // Rooms suitable for subjects
        let rooms = config.rooms.clone();
        let mut subject_rooms = BTreeMap::new();
        for (subject, room_names) in config.subject_rooms.iter() {
            let resolved = room_names
                .iter()
                .map(|r| find(&rooms, r, "room").map(|i| i + 1))
                .collect::<Result<Vec<usize>, Error>>()?;
            subject_rooms.insert(subject_index(subject)?, resolved);
        }

        debug!(
            "Resolved {} levels, {} classes, {} subjects, {} teachers and {} rooms",
            levels.len(),
            classes.len(),
            subjects.len(),
            teachers.len(),
            rooms.len()
        );
        Ok(Catalog {
            grid,
            subjects,
            levels,
            classes,
            rooms,
            teachers,
            teacher_map,
            subject_rooms,
        })
    }

    pub fn day(&self, label: &str) -> Result<usize, Error> {
        find(&self.grid.days, label, "day")
    }

    pub fn slot(&self, label: &str) -> Result<usize, Error> {
        find(&self.grid.slots, label, "slot")
    }

    /// Resolve a list of slot labels
    pub fn slots(&self, labels: &[String]) -> Result<Vec<usize>, Error> {
        labels.iter().map(|l| self.slot(l)).collect()
    }

    /// Subject index (1-based) of a subject name
    pub fn subject(&self, name: &str) -> Result<usize, Error> {
        find(&self.subjects, name, "subject").map(|i| i + 1)
    }

    pub fn level(&self, name: &str) -> Result<usize, Error> {
        self.levels
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| Error::Configuration(format!("Unknown level '{}'", name)))
    }

    pub fn class(&self, name: &str) -> Result<usize, Error> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::Configuration(format!("Unknown class '{}'", name)))
    }

    /// Room index (1-based) of a room name
    pub fn room(&self, name: &str) -> Result<usize, Error> {
        find(&self.rooms, name, "room").map(|i| i + 1)
    }

    pub fn teacher(&self, id: &str) -> Result<usize, Error> {
        find(&self.teachers, id, "teacher")
    }

    /// Display name of a subject index ("-" for a free slot)
    pub fn subject_name(&self, subject: usize) -> &str {
        if subject == crate::FREE {
            "-"
        } else {
            self.subjects.get(subject - 1).map_or("?", |s| s.as_str())
        }
    }

    /// Display name of a room index ("" for no room)
    pub fn room_name(&self, room: usize) -> &str {
        if room == crate::NO_ROOM {
            ""
        } else {
            self.rooms.get(room - 1).map_or("?", |s| s.as_str())
        }
    }

    /// Indexes of all classes of a level
    pub fn classes_of_level(&self, level: usize) -> Vec<usize> {
        self.classes
            .iter()
            .filter(|c| c.level == level)
            .map(|c| c.index)
            .collect()
    }

    /// Resolve a class filter to the list of class indexes
    pub fn select_classes(&self, filter: &ClassFilter) -> Result<Vec<usize>, Error> {
        match filter {
            ClassFilter::All => Ok((0..self.classes.len()).collect()),
            ClassFilter::Level(level) => Ok(self.classes_of_level(self.level(level)?)),
            ClassFilter::Classes(names) => names.iter().map(|n| self.class(n)).collect(),
        }
    }

    /// Weekly hours of `subject` for the classes of `level` (0 if the subject is not taught at the level)
    pub fn quota(&self, level: usize, subject: usize) -> u32 {
        self.levels[level].quotas.get(&subject).copied().unwrap_or(0)
    }

    /// Subject indexes allowed for a class
    pub fn allowed_subjects(&self, class: usize) -> impl Iterator<Item = usize> + '_ {
        self.levels[self.classes[class].level].quotas.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::ClassFilter;
    use crate::testing;
    use crate::Error;

    #[test]
    fn resolve_simple_config() {
        let catalog = super::Catalog::from_config(&testing::simple_config()).unwrap();
        assert_eq!(catalog.grid.num_days(), 2);
        assert_eq!(catalog.grid.morning(), 0..4);
        assert_eq!(catalog.grid.afternoon(), 5..6);
        assert_eq!(catalog.subject("Maths").unwrap(), 1);
        assert_eq!(catalog.subject_name(1), "Maths");
        assert_eq!(catalog.subject_name(0), "-");
        assert_eq!(catalog.room("Gymnase").unwrap(), 3);

        // Levels are sorted by name
        let l5 = catalog.level("5e").unwrap();
        let l6 = catalog.level("6e").unwrap();
        assert_eq!(catalog.classes[0].level, l6);
        assert_eq!(catalog.classes[2].level, l5);
        assert_eq!(catalog.classes_of_level(l6), vec![0, 1]);
        assert_eq!(catalog.quota(l6, catalog.subject("EPS").unwrap()), 2);
        assert_eq!(catalog.quota(l6, catalog.subject("Latin").unwrap()), 0);
        assert_eq!(catalog.allowed_subjects(2).collect::<Vec<_>>(), vec![1, 2, 3, 5]);
        assert_eq!(catalog.classes[2].subgroups[0].skipped_subjects, vec![5]);

        // Normalized teacher references
        let maths = catalog.subject("Maths").unwrap();
        let french = catalog.subject("Français").unwrap();
        let t_math = catalog.teacher("T_MATH").unwrap();
        let t_fr1 = catalog.teacher("T_FR1").unwrap();
        assert_eq!(catalog.teacher_map.teachers(maths, l5).collect::<Vec<_>>(), vec![t_math]);
        assert_eq!(catalog.teacher_map.teachers(maths, l6).collect::<Vec<_>>(), vec![t_math]);
        assert!(catalog.teacher_map.covers(t_fr1, french, l6));
        assert!(!catalog.teacher_map.covers(t_fr1, french, l5));
        assert_eq!(catalog.teacher_map.assignments(t_fr1), vec![(l6, french)]);
        assert_eq!(
            catalog.subject_rooms[&catalog.subject("EPS").unwrap()],
            vec![3]
        );

        assert_eq!(
            catalog.select_classes(&ClassFilter::Level("5e".to_owned())).unwrap(),
            vec![2]
        );
        assert_eq!(catalog.select_classes(&ClassFilter::All).unwrap(), vec![0, 1, 2]);
        assert!(catalog
            .select_classes(&ClassFilter::Classes(vec!["6eC".to_owned()]))
            .is_err());
    }

    #[test]
    fn missing_quota_entry() {
        let mut config = testing::simple_config();
        config.classes[0].name = "4eA".to_owned();
        match super::Catalog::from_config(&config) {
            Err(Error::Configuration(msg)) => assert!(msg.contains("4e"), "{}", msg),
            x => panic!("Expected configuration error, got {:?}", x),
        }
    }

    #[test]
    fn explicit_level() {
        let mut config = testing::simple_config();
        config.classes[0].name = "Sixième A".to_owned();
        config.classes[0].level = Some("6e".to_owned());
        let catalog = super::Catalog::from_config(&config).unwrap();
        assert_eq!(catalog.classes[0].level, catalog.level("6e").unwrap());
    }

    #[test]
    fn unknown_labels() {
        let mut config = testing::simple_config();
        config.quotas.get_mut("6e").unwrap().insert("Physique".to_owned(), 1);
        assert!(super::Catalog::from_config(&config).is_err());

        let mut config = testing::simple_config();
        config.subject_rooms.insert("EPS".to_owned(), vec!["Piscine".to_owned()]);
        assert!(super::Catalog::from_config(&config).is_err());

        let mut config = testing::simple_config();
        config.days.push("Lundi".to_owned());
        assert!(super::Catalog::from_config(&config).is_err());
    }

    #[test]
    fn catalog_size_limit() {
        let mut config = testing::simple_config();
        config.rooms.extend((config.rooms.len()..127).map(|i| format!("R{}", i)));
        assert!(super::Catalog::from_config(&config).is_ok());
        config.rooms.push("R127".to_owned());
        assert!(matches!(
            super::Catalog::from_config(&config),
            Err(Error::Configuration(m)) if m.contains("127")
        ));

        let mut config = testing::simple_config();
        config.subjects.extend((0..200).map(|i| format!("Option {}", i)));
        assert!(matches!(super::Catalog::from_config(&config), Err(Error::Configuration(_))));
    }
}

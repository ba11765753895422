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

//! Rule modules, translating institutional rules into constraints of a `Session`.
//!
//! Each submodule provides a resolved rule type (all labels replaced by catalog indexes) and a function adding the
//! rule's constraints to a session. The modules can be applied in any order and any subset.
//! `RuleSet::resolve()` resolves all rules of a configuration at once, `apply()` adds them to a session.

pub mod availability;
pub mod exclusivity;
pub mod load_limit;
pub mod lunch;
pub mod room_linkage;
pub mod sequencing;
pub mod synchronization;
pub mod targeted;

use crate::catalog::Catalog;
use crate::io::config::Configuration;
use crate::objective::LoadWeights;
use crate::session::Session;
use crate::Error;
use log::info;

/// Pre-placed subject and/or room of a class at one slot
#[derive(Clone, Debug, PartialEq)]
pub struct FixedLesson {
    pub class: usize,
    pub day: usize,
    pub slot: usize,
    pub subject: Option<usize>,
    pub room: Option<usize>,
}

/// All rules of a configuration, resolved against its catalog
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
    pub teacher_unavailability: Vec<availability::Unavailability>,
    pub room_unavailability: Vec<availability::Unavailability>,
    pub room_exclusivity: bool,
    pub teacher_exclusivity: bool,
    pub link_rooms: bool,
    pub fixed: Vec<FixedLesson>,
    /// (level, subject) pairs to synchronize
    pub synchronized: Vec<(usize, usize)>,
    pub exclude_follow: Vec<sequencing::ExcludeFollow>,
    pub include_follow: Vec<sequencing::IncludeFollow>,
    pub lunch: Option<lunch::LunchRule>,
    pub load_limits: Vec<load_limit::LoadLimit>,
    pub targeted: Vec<targeted::Targeted>,
    pub load_weights: Option<LoadWeights>,
}

impl RuleSet {
    /// Resolve all rules of the configuration
    ///
    /// # Errors
    ///
    /// Fails with `Error::Configuration` on the first rule referring to an unknown label.
    pub fn resolve(config: &Configuration, catalog: &Catalog) -> Result<RuleSet, Error> {
        let mut fixed = Vec::new();
        for f in config.fixed.iter() {
            fixed.push(FixedLesson {
                class: catalog.class(&f.class)?,
                day: catalog.day(&f.day)?,
                slot: catalog.slot(&f.slot)?,
                subject: f.subject.as_deref().map(|s| catalog.subject(s)).transpose()?,
                room: f.room.as_deref().map(|r| catalog.room(r)).transpose()?,
            });
        }

        Ok(RuleSet {
            teacher_unavailability: config
                .teacher_unavailability
                .iter()
                .map(|u| availability::Unavailability::resolve_teacher(u, catalog))
                .collect::<Result<_, _>>()?,
            room_unavailability: config
                .room_unavailability
                .iter()
                .map(|u| availability::Unavailability::resolve_room(u, catalog))
                .collect::<Result<_, _>>()?,
            room_exclusivity: config.room_exclusivity,
            teacher_exclusivity: config.teacher_exclusivity,
            link_rooms: config.link_rooms,
            fixed,
            synchronized: config
                .synchronized
                .iter()
                .map(|s| Ok((catalog.level(&s.level)?, catalog.subject(&s.subject)?)))
                .collect::<Result<_, Error>>()?,
            exclude_follow: config
                .exclude_follow
                .iter()
                .map(|r| sequencing::ExcludeFollow::resolve(r, catalog))
                .collect::<Result<_, _>>()?,
            include_follow: config
                .include_follow
                .iter()
                .map(|r| sequencing::IncludeFollow::resolve(r, catalog))
                .collect::<Result<_, _>>()?,
            lunch: config
                .lunch
                .as_ref()
                .map(|l| lunch::LunchRule::resolve(l, catalog))
                .transpose()?,
            load_limits: config
                .load_limits
                .iter()
                .map(|r| load_limit::LoadLimit::resolve(r, catalog))
                .collect::<Result<_, _>>()?,
            targeted: config
                .targeted
                .iter()
                .map(|r| targeted::Targeted::resolve(r, catalog))
                .collect::<Result<_, _>>()?,
            load_weights: config
                .load_weights
                .as_ref()
                .map(|w| LoadWeights::resolve(w, catalog))
                .transpose()?,
        })
    }
}

/// Add the constraints and penalty terms of all rules to the session
pub fn apply(session: &mut Session, rules: &RuleSet) -> Result<(), Error> {
    for f in rules.fixed.iter() {
        if let Some(subject) = f.subject {
            session.fix_lesson(f.class, f.day, f.slot, subject);
        }
        if let Some(room) = f.room {
            session.fix_room(f.class, f.day, f.slot, room);
        }
    }
    for u in rules.teacher_unavailability.iter() {
        availability::forbid_teacher(session, u);
    }
    for u in rules.room_unavailability.iter() {
        availability::forbid_room(session, u);
    }
    if rules.room_exclusivity {
        exclusivity::add_room_exclusivity(session);
    }
    if rules.teacher_exclusivity {
        exclusivity::add_teacher_exclusivity(session);
    }
    if rules.link_rooms {
        room_linkage::link_rooms(session);
    }
    for (level, subject) in rules.synchronized.iter() {
        synchronization::synchronize(session, *level, *subject)?;
    }
    for rule in rules.exclude_follow.iter() {
        sequencing::exclude_follow(session, rule);
    }
    for rule in rules.include_follow.iter() {
        sequencing::include_follow(session, rule);
    }
    if let Some(rule) = rules.lunch.as_ref() {
        lunch::allocate_lunch(session, rule)?;
    }
    for rule in rules.load_limits.iter() {
        load_limit::limit_load(session, rule);
    }
    for rule in rules.targeted.iter() {
        targeted::require_occurrences(session, rule);
    }
    if let Some(weights) = rules.load_weights.as_ref() {
        crate::objective::add_load_penalty(session, weights);
    }
    info!(
        "Applied rules. Model has {} variables and {} constraints.",
        session.model().num_vars(),
        session.model().num_constraints()
    );
    Ok(())
}

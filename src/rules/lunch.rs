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

//! Allocation of lunch slots to classes, based on the cafeteria's capacity

use crate::catalog::Catalog;
use crate::io::config::LunchConfig;
use crate::session::Session;
use crate::{Error, FREE};
use log::info;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct LunchRule {
    /// Students served per slot
    pub capacity: u32,
    /// Share of students eating at the cafeteria
    pub proportion: f64,
    /// Candidate slots, in order of rotation
    pub slots: Vec<usize>,
    pub primary: usize,
    /// Lunch slot per level index
    pub priority: BTreeMap<usize, usize>,
    pub priority_active: bool,
}

impl LunchRule {
    /// Resolve the lunch configuration
    ///
    /// # Errors
    ///
    /// Fails with `Error::Configuration`, if labels are unknown, the proportion is not within [0, 1] or the primary
    /// or a priority slot is not among the candidate slots.
    pub fn resolve(config: &LunchConfig, catalog: &Catalog) -> Result<Self, Error> {
        if !(0.0..=1.0).contains(&config.proportion) {
            return Err(Error::Configuration(format!(
                "Lunch proportion {} is not within [0, 1]",
                config.proportion
            )));
        }
        let slots = catalog.slots(&config.slots)?;
        if slots.is_empty() {
            return Err(Error::Configuration("No lunch slots given".to_owned()));
        }
        let primary = catalog.slot(&config.primary)?;
        let mut priority = BTreeMap::new();
        for (level, slot) in config.priority.iter() {
            priority.insert(catalog.level(level)?, catalog.slot(slot)?);
        }
        for slot in std::iter::once(&primary).chain(priority.values()) {
            if !slots.contains(slot) {
                return Err(Error::Configuration(format!(
                    "Lunch slot {} is not among the lunch slots",
                    catalog.grid.slots[*slot]
                )));
            }
        }
        Ok(LunchRule {
            capacity: config.capacity,
            proportion: config.proportion,
            slots,
            primary,
            priority,
            priority_active: config.priority_active,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LunchMode {
    /// All classes eat at the primary slot
    Primary,
    /// Classes rotate over the candidate slots in catalog order
    RoundRobin,
    /// Each class eats at its level's slot
    Priority,
}

/// Result of the lunch allocation
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LunchAllocation {
    /// Number of students eating at the cafeteria
    pub demand: u32,
    pub mode: LunchMode,
    /// Lunch slot index per class index
    pub slots: Vec<usize>,
}

/// Number of students eating at the cafeteria
pub fn demand(catalog: &Catalog, proportion: f64) -> u32 {
    catalog
        .classes
        .iter()
        .map(|c| (c.capacity as f64 * proportion).floor() as u32)
        .sum()
}

/// Decide on the lunch slot of each class
pub fn allocate(catalog: &Catalog, rule: &LunchRule) -> Result<LunchAllocation, Error> {
    let demand = demand(catalog, rule.proportion);
    let (mode, slots) = if demand <= rule.capacity {
        (LunchMode::Primary, vec![rule.primary; catalog.classes.len()])
    } else if !rule.priority_active {
        let slots = (0..catalog.classes.len())
            .map(|i| rule.slots[i % rule.slots.len()])
            .collect();
        (LunchMode::RoundRobin, slots)
    } else {
        let slots = catalog
            .classes
            .iter()
            .map(|c| {
                rule.priority.get(&c.level).copied().ok_or_else(|| {
                    Error::Configuration(format!(
                        "No priority lunch slot for level {}",
                        catalog.levels[c.level].name
                    ))
                })
            })
            .collect::<Result<_, _>>()?;
        (LunchMode::Priority, slots)
    };
    Ok(LunchAllocation { demand, mode, slots })
}

/// Allocate the lunch slots and keep each class free at its lunch slot on every day
pub fn allocate_lunch(session: &mut Session, rule: &LunchRule) -> Result<LunchAllocation, Error> {
    let allocation = allocate(session.catalog(), rule)?;
    info!(
        "Lunch demand is {} students for a capacity of {}. Allocating lunch slots in {:?} mode.",
        allocation.demand, rule.capacity, allocation.mode
    );
    for (class, slot) in allocation.slots.iter().enumerate() {
        for day in 0..session.catalog().grid.num_days() {
            session.fix_lesson(class, day, *slot, FREE);
        }
    }
    session.set_lunch(allocation.clone());
    Ok(allocation)
}

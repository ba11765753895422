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

//! Exact number of lessons of some subjects within a window of slots

use crate::catalog::Catalog;
use crate::cp::Comparison;
use crate::io::config::TargetedConfig;
use crate::session::Session;
use crate::Error;
use log::debug;
use std::ops::RangeInclusive;

#[derive(Clone, Debug, PartialEq)]
pub struct Targeted {
    pub classes: Vec<usize>,
    pub subjects: Vec<usize>,
    pub day: usize,
    pub slots: RangeInclusive<usize>,
    /// Required number of lessons per class. If `None`, as many lessons as the window and the remaining quotas allow.
    pub count: Option<u32>,
}

impl Targeted {
    pub fn resolve(rule: &TargetedConfig, catalog: &Catalog) -> Result<Self, Error> {
        let start = catalog.slot(&rule.start)?;
        let end = match rule.end.as_ref() {
            Some(end) => catalog.slot(end)?,
            None => start,
        };
        if end < start {
            return Err(Error::Configuration(format!(
                "Targeted window ends ({}) before it starts ({})",
                catalog.grid.slots[end], catalog.grid.slots[start]
            )));
        }
        Ok(Targeted {
            classes: catalog.select_classes(&rule.classes)?,
            subjects: rule
                .subjects
                .iter()
                .map(|s| catalog.subject(s))
                .collect::<Result<_, _>>()?,
            day: catalog.day(&rule.day)?,
            slots: start..=end,
            count: rule.count,
        })
    }
}

/// For every selected class, require the number of lessons of the rule's subjects within the window.
///
/// Without an explicit count, the window is filled up to the quota of the subjects which is not yet required by
/// earlier targeted rules for the same class and subjects.
pub fn require_occurrences(session: &mut Session, rule: &Targeted) {
    for class in rule.classes.iter() {
        let level = session.catalog().classes[*class].level;
        let subjects: Vec<usize> = rule
            .subjects
            .iter()
            .copied()
            .filter(|s| session.catalog().levels[level].quotas.contains_key(s))
            .collect();
        let required = match rule.count {
            Some(count) => count,
            None => {
                let quota: u32 = subjects.iter().map(|s| session.catalog().quota(level, *s)).sum();
                let remaining = quota.saturating_sub(session.targeted_lessons(*class, &subjects));
                (rule.slots.clone().count() as u32).min(remaining)
            }
        };
        session.reserve_targeted(*class, &subjects, required);
        debug!(
            "Class {} requires {} targeted lessons",
            session.catalog().classes[*class].name,
            required
        );
        let count = session.count_in_slots(*class, rule.day, rule.slots.clone(), &subjects);
        session.model_mut().add_linear(count, Comparison::Equal, required as i64);
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::{ClassFilter, TargetedConfig};
    use crate::testing;
    use crate::SolveOutcome;

    fn targeted(end: Option<&str>, count: Option<u32>) -> TargetedConfig {
        TargetedConfig {
            classes: ClassFilter::Classes(vec!["L1b".to_owned()]),
            subjects: vec!["B".to_owned()],
            day: "D2".to_owned(),
            start: "S2".to_owned(),
            end: end.map(|e| e.to_owned()),
            count,
        }
    }

    #[test]
    fn exact_count() {
        let mut config = testing::tiny_config();
        config.targeted.push(targeted(Some("S4"), Some(1)));
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        let count = (1..4).filter(|slot| timetable.subject(1, 1, *slot) == b).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn default_count() {
        // Window of three slots, but only two lessons of B
        let mut config = testing::tiny_config();
        config.targeted.push(targeted(Some("S4"), None));
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        let count = (1..4).filter(|slot| timetable.subject(1, 1, *slot) == b).count();
        assert_eq!(count, 2);

        // Single slot
        let mut config = testing::tiny_config();
        config.targeted.push(targeted(None, None));
        let timetable = testing::solve_feasible(&config);
        assert_eq!(timetable.subject(1, 1, 1), b);
    }

    #[test]
    fn windows_share_quota() {
        // Two windows of two slots, but only two lessons of B for both of them
        let mut config = testing::tiny_config();
        for day in ["D1", "D2"] {
            let mut rule = targeted(Some("S2"), None);
            rule.day = day.to_owned();
            rule.start = "S1".to_owned();
            config.targeted.push(rule);
        }
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        assert_eq!(timetable.subject(1, 0, 0), b);
        assert_eq!(timetable.subject(1, 0, 1), b);
        assert!((0..2).all(|slot| timetable.subject(1, 1, slot) != b));
    }

    #[test]
    fn explicit_count_uses_quota() {
        let mut config = testing::tiny_config();
        let mut rule = targeted(None, Some(1));
        rule.day = "D1".to_owned();
        config.targeted.push(rule);
        config.targeted.push(targeted(Some("S4"), None));
        let timetable = testing::solve_feasible(&config);
        let b = timetable.catalog().subject("B").unwrap();
        assert_eq!(timetable.subject(1, 0, 1), b);
        assert_eq!((1..4).filter(|slot| timetable.subject(1, 1, *slot) == b).count(), 1);
    }

    #[test]
    fn impossible_count() {
        let mut config = testing::tiny_config();
        config.targeted.push(targeted(Some("S3"), Some(3)));
        assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));
    }

    #[test]
    fn inverted_window() {
        let mut config = testing::tiny_config();
        let mut rule = targeted(Some("S1"), None);
        rule.start = "S3".to_owned();
        config.targeted.push(rule);
        assert!(crate::build_session(&config).is_err());
    }
}

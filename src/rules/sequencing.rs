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

//! Rules about subjects in directly consecutive slots of a day

use crate::catalog::Catalog;
use crate::cp::{Comparison, LinearExpr};
use crate::io::config::{self, ExcludeStrength, IncludeStrength};
use crate::session::Session;
use crate::Error;
use log::debug;

/// `first` must not be directly followed by `then`
#[derive(Clone, Debug, PartialEq)]
pub struct ExcludeFollow {
    pub first: usize,
    pub then: usize,
    /// Accepted for compatibility. Both strengths forbid the same pairs.
    pub strength: ExcludeStrength,
    pub classes: Vec<usize>,
}

impl ExcludeFollow {
    pub fn resolve(rule: &config::ExcludeFollowConfig, catalog: &Catalog) -> Result<Self, Error> {
        Ok(ExcludeFollow {
            first: catalog.subject(&rule.first)?,
            then: catalog.subject(&rule.then)?,
            strength: rule.strength,
            classes: catalog.select_classes(&rule.classes)?,
        })
    }
}

/// `first` should be directly followed by `then`, with independent strength knobs:
/// * `strong`: every `first` lesson is directly followed by `then`
/// * `medium`: the pair occurs at least `target` times per week
/// * `weak`: the pair occurs at most `target` times per week
#[derive(Clone, Debug, PartialEq)]
pub struct IncludeFollow {
    pub first: usize,
    pub then: usize,
    pub strong: bool,
    pub medium: bool,
    pub weak: bool,
    pub target: u32,
    pub classes: Vec<usize>,
}

impl IncludeFollow {
    pub fn resolve(rule: &config::IncludeFollowConfig, catalog: &Catalog) -> Result<Self, Error> {
        if rule.strengths.is_empty() {
            return Err(Error::Configuration(format!(
                "Include-follow rule {} → {} has no strength",
                rule.first, rule.then
            )));
        }
        Ok(IncludeFollow {
            first: catalog.subject(&rule.first)?,
            then: catalog.subject(&rule.then)?,
            strong: rule.strengths.contains(&IncludeStrength::Strong),
            medium: rule.strengths.contains(&IncludeStrength::Medium),
            weak: rule.strengths.contains(&IncludeStrength::Weak),
            target: rule.target,
            classes: catalog.select_classes(&rule.classes)?,
        })
    }
}

/// Forbid `first` at slot h together with `then` at slot h+1 of the same day
pub fn exclude_follow(session: &mut Session, rule: &ExcludeFollow) {
    let num_slots = session.catalog().grid.num_slots();
    for class in rule.classes.iter() {
        for day in 0..session.catalog().grid.num_days() {
            for slot in 0..num_slots.saturating_sub(1) {
                let a = session.has_subject(*class, day, slot, rule.first);
                let b = session.has_subject(*class, day, slot + 1, rule.then);
                session.model_mut().add_clause(vec![a.negated(), b.negated()]);
            }
        }
    }
    debug!(
        "{} must not be followed by {} in {} classes",
        session.catalog().subject_name(rule.first),
        session.catalog().subject_name(rule.then),
        rule.classes.len()
    );
}

/// Add the selected strengths of an include-follow rule
pub fn include_follow(session: &mut Session, rule: &IncludeFollow) {
    let num_slots = session.catalog().grid.num_slots();
    for class in rule.classes.iter() {
        let mut pairs = Vec::new();
        for day in 0..session.catalog().grid.num_days() {
            for slot in 0..num_slots.saturating_sub(1) {
                let a = session.has_subject(*class, day, slot, rule.first);
                let b = session.has_subject(*class, day, slot + 1, rule.then);
                if rule.strong {
                    session.model_mut().add_implication(a.into(), b.into());
                }
                if rule.medium || rule.weak {
                    // s ⇔ a ∧ b
                    let name = format!("follow {}/{}/{}", session.catalog().classes[*class].name, day, slot);
                    let model = session.model_mut();
                    let s = model.new_bool_var(name);
                    model.add_implication(s.into(), a.into());
                    model.add_implication(s.into(), b.into());
                    model.add_clause(vec![a.negated(), b.negated(), s.into()]);
                    pairs.push(s);
                }
            }
        }
        if rule.medium {
            session.model_mut().add_linear(
                LinearExpr::count(pairs.iter().copied()),
                Comparison::GreaterEqual,
                rule.target as i64,
            );
        }
        if rule.weak {
            session
                .model_mut()
                .add_linear(LinearExpr::count(pairs), Comparison::LessEqual, rule.target as i64);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::io::config::{
        ClassFilter, ExcludeFollowConfig, ExcludeStrength, FixedLesson, IncludeFollowConfig, IncludeStrength,
    };
    use crate::testing;
    use crate::{SolveOutcome, Timetable};

    fn count_pairs(timetable: &Timetable, class: usize, first: usize, then: usize) -> usize {
        let mut count = 0;
        for day in 0..2 {
            for slot in 0..3 {
                if timetable.subject(class, day, slot) == first && timetable.subject(class, day, slot + 1) == then {
                    count += 1;
                }
            }
        }
        count
    }

    fn exclude_rule(strength: ExcludeStrength) -> ExcludeFollowConfig {
        ExcludeFollowConfig {
            first: "A".to_owned(),
            then: "B".to_owned(),
            strength,
            classes: ClassFilter::All,
        }
    }

    fn fixed(slot: &str, subject: &str) -> FixedLesson {
        FixedLesson {
            class: "L1a".to_owned(),
            day: "D1".to_owned(),
            slot: slot.to_owned(),
            subject: Some(subject.to_owned()),
            room: None,
        }
    }

    #[test]
    fn exclude_follow() {
        for strength in [ExcludeStrength::Strong, ExcludeStrength::Weak] {
            let mut config = testing::tiny_config();
            config.exclude_follow.push(exclude_rule(strength));
            let timetable = testing::solve_feasible(&config);
            let a = timetable.catalog().subject("A").unwrap();
            let b = timetable.catalog().subject("B").unwrap();
            for class in 0..2 {
                assert_eq!(count_pairs(&timetable, class, a, b), 0);
            }
        }
    }

    #[test]
    fn exclude_follow_forbids_sequence() {
        for strength in [ExcludeStrength::Strong, ExcludeStrength::Weak] {
            let mut config = testing::tiny_config();
            config.exclude_follow.push(exclude_rule(strength));
            config.fixed.push(fixed("S1", "A"));
            config.fixed.push(fixed("S2", "B"));
            assert!(matches!(testing::solve(&config), SolveOutcome::Infeasible));

            // The reverse order is allowed
            let mut config = testing::tiny_config();
            config.exclude_follow.push(exclude_rule(strength));
            config.fixed.push(fixed("S1", "B"));
            config.fixed.push(fixed("S2", "A"));
            let timetable = testing::solve_feasible(&config);
            assert_eq!(timetable.subject(0, 0, 1), timetable.catalog().subject("A").unwrap());
        }
    }

    #[test]
    fn include_follow_strong() {
        let mut config = testing::tiny_config();
        config.include_follow.push(IncludeFollowConfig {
            first: "B".to_owned(),
            then: "A".to_owned(),
            strengths: vec![IncludeStrength::Strong],
            target: 0,
            classes: ClassFilter::Classes(vec!["L1b".to_owned()]),
        });
        let timetable = testing::solve_feasible(&config);
        let a = timetable.catalog().subject("A").unwrap();
        let b = timetable.catalog().subject("B").unwrap();
        for day in 0..2 {
            for slot in 0..3 {
                if timetable.subject(1, day, slot) == b {
                    assert_eq!(timetable.subject(1, day, slot + 1), a);
                }
            }
        }
    }

    #[test]
    fn include_follow_medium_and_weak() {
        let mut config = testing::tiny_config();
        config.include_follow.push(IncludeFollowConfig {
            first: "B".to_owned(),
            then: "A".to_owned(),
            strengths: vec![IncludeStrength::Medium, IncludeStrength::Weak],
            target: 1,
            classes: ClassFilter::Level("L1".to_owned()),
        });
        let timetable = testing::solve_feasible(&config);
        let a = timetable.catalog().subject("A").unwrap();
        let b = timetable.catalog().subject("B").unwrap();
        for class in 0..2 {
            assert_eq!(count_pairs(&timetable, class, b, a), 1);
        }
    }

    #[test]
    fn include_follow_without_strength() {
        let mut config = testing::tiny_config();
        config.include_follow.push(IncludeFollowConfig {
            first: "B".to_owned(),
            then: "A".to_owned(),
            strengths: vec![],
            target: 1,
            classes: ClassFilter::All,
        });
        assert!(crate::build_session(&config).is_err());
    }
}

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

//! Maximum number of lessons of a subject per day or half-day

use crate::catalog::Catalog;
use crate::cp::Comparison;
use crate::io::config::{LoadLimitConfig, LoadScope};
use crate::session::Session;
use crate::Error;
use std::ops::Range;

#[derive(Clone, Debug, PartialEq)]
pub struct LoadLimit {
    pub level: usize,
    pub subject: usize,
    pub max: u32,
    pub scope: LoadScope,
}

impl LoadLimit {
    pub fn resolve(rule: &LoadLimitConfig, catalog: &Catalog) -> Result<Self, Error> {
        Ok(LoadLimit {
            level: catalog.level(&rule.level)?,
            subject: catalog.subject(&rule.subject)?,
            max: rule.max,
            scope: rule.scope,
        })
    }
}

/// Limit the lessons of the subject for every class of the level and every day (or both half-days of every day)
pub fn limit_load(session: &mut Session, rule: &LoadLimit) {
    let grid = &session.catalog().grid;
    let ranges: Vec<Range<usize>> = match rule.scope {
        LoadScope::FullDay => vec![0..grid.num_slots()],
        LoadScope::HalfDay => vec![grid.morning(), grid.afternoon()],
    };
    let num_days = grid.num_days();
    for class in session.catalog().classes_of_level(rule.level) {
        for day in 0..num_days {
            for range in ranges.iter() {
                let count = session.count_in_slots(class, day, range.clone(), &[rule.subject]);
                session
                    .model_mut()
                    .add_linear(count, Comparison::LessEqual, rule.max as i64);
            }
        }
    }
}

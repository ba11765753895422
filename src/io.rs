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

pub mod config;
pub mod simple;

use crate::Timetable;
use std::fmt::Write;

/// Format the calculated timetable into a human readable String (e.g. to print it to stdout).
///
/// The output format will look like
/// ```text
/// ===== 6eA =====
/// Lundi
///   8h   -
///   9h   Maths (S1)
///   …
/// Mardi
///   …
///
/// ===== 6eB =====
/// …
/// ```
pub fn format_timetable(timetable: &Timetable) -> String {
    let catalog = timetable.catalog();
    let width = catalog.grid.slots.iter().map(|s| s.chars().count()).max().unwrap_or(0);
    let mut result = String::new();
    for class in catalog.classes.iter() {
        write!(result, "\n===== {} =====\n", class.name).unwrap();
        for (d, day) in catalog.grid.days.iter().enumerate() {
            writeln!(result, "{}", day).unwrap();
            for (s, slot) in catalog.grid.slots.iter().enumerate() {
                let room = timetable.room(class.index, d, s);
                write!(
                    result,
                    "  {:width$} {}",
                    slot,
                    catalog.subject_name(timetable.subject(class.index, d, s)),
                    width = width
                )
                .unwrap();
                if room != crate::NO_ROOM {
                    write!(result, " ({})", catalog.room_name(room)).unwrap();
                }
                result.push('\n');
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use crate::testing;

    #[test]
    fn format_simple_timetable() {
        let timetable = testing::solve_feasible(&testing::simple_config());
        let text = super::format_timetable(&timetable);
        assert!(text.contains("===== 6eA ====="));
        assert!(text.contains("===== 5eA ====="));
        assert!(text.contains("  9h  Histoire (S2)\n"));
        assert_eq!(text.matches("Lundi\n").count(), 3);
        assert_eq!(text.matches("Latin").count(), 1);
    }
}

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

//! Simple JSON representation of a solved timetable

use crate::Timetable;
use serde::Serialize;
use serde_json::json;

/// One slot of a class' timetable
#[derive(Serialize, Debug, Clone, PartialEq)]
struct LessonEntry<'a> {
    day: &'a str,
    slot: &'a str,
    subject: Option<&'a str>,
    room: Option<&'a str>,
}

/// Write the timetable as simple JSON representation to a Writer (e.g. an output file).
///
/// The document contains one list of lessons per class name. Free slots have `subject: null`, lessons without room
/// `room: null`.
pub fn write<W: std::io::Write>(writer: W, timetable: &Timetable) -> Result<(), String> {
    let catalog = timetable.catalog();
    let mut classes = serde_json::Map::new();
    for class in catalog.classes.iter() {
        let mut lessons = Vec::new();
        for (d, day) in catalog.grid.days.iter().enumerate() {
            for (s, slot) in catalog.grid.slots.iter().enumerate() {
                let subject = timetable.subject(class.index, d, s);
                let room = timetable.room(class.index, d, s);
                lessons.push(LessonEntry {
                    day,
                    slot,
                    subject: (subject != crate::FREE).then(|| catalog.subject_name(subject)),
                    room: (room != crate::NO_ROOM).then(|| catalog.room_name(room)),
                });
            }
        }
        classes.insert(
            class.name.clone(),
            serde_json::to_value(lessons).map_err(|e| format!("{}", e))?,
        );
    }
    let lunch = timetable.lunch().map(|l| {
        json!({
            "demand": l.demand,
            "mode": l.mode,
            "slots": catalog
                .classes
                .iter()
                .map(|c| (c.name.clone(), json!(catalog.grid.slots[l.slots[c.index]])))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
        })
    });
    let data = json!({
        "format": "X-timetable-simple",
        "version": "1.0",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "status": timetable.status().to_string(),
        "objective": timetable.objective(),
        "classes": classes,
        "lunch": lunch,
    });
    serde_json::to_writer(writer, &data).map_err(|e| format!("{}", e))?;

    Ok(())
}

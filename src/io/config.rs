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

//! The JSON configuration document. All entities are referenced by their exact label here; the labels are resolved to
//! indexes once by `Catalog::from_config()` and `RuleSet::resolve()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The complete configuration of a timetable problem
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Configuration {
    /// Day labels in order
    pub days: Vec<String>,
    /// Slot labels in order. Labels are only used for display and for resolving rule references.
    pub slots: Vec<String>,
    /// Index of the slot separating morning and afternoon. It belongs to neither half-day.
    #[serde(default = "default_lunch_boundary")]
    pub lunch_boundary: usize,
    /// Subject names. Subject index i+1 refers to `subjects[i]`; index 0 means "no class".
    pub subjects: Vec<String>,
    /// Weekly hours per level and subject. The subjects listed for a level are the only ones allowed for its classes.
    pub quotas: BTreeMap<String, BTreeMap<String, u32>>,
    /// Teachers of each subject
    #[serde(default)]
    pub teachers: BTreeMap<String, TeacherReference>,
    pub classes: Vec<ClassConfig>,
    /// Room names. Room index i+1 refers to `rooms[i]`; index 0 means "no room".
    #[serde(default)]
    pub rooms: Vec<String>,
    #[serde(default)]
    pub teacher_unavailability: Vec<Unavailability>,
    #[serde(default)]
    pub room_unavailability: Vec<Unavailability>,
    /// Rooms suitable for a subject. Subjects without entry may be held in any room.
    #[serde(default)]
    pub subject_rooms: BTreeMap<String, Vec<String>>,
    /// Tie every class' room variable to its scheduled subject's room requirement
    #[serde(default)]
    pub link_rooms: bool,
    #[serde(default = "default_true")]
    pub room_exclusivity: bool,
    #[serde(default = "default_true")]
    pub teacher_exclusivity: bool,
    /// Pre-placed lessons and rooms
    #[serde(default)]
    pub fixed: Vec<FixedLesson>,
    #[serde(default)]
    pub synchronized: Vec<SyncRequest>,
    #[serde(default)]
    pub exclude_follow: Vec<ExcludeFollowConfig>,
    #[serde(default)]
    pub include_follow: Vec<IncludeFollowConfig>,
    #[serde(default)]
    pub lunch: Option<LunchConfig>,
    #[serde(default)]
    pub load_limits: Vec<LoadLimitConfig>,
    #[serde(default)]
    pub targeted: Vec<TargetedConfig>,
    #[serde(default)]
    pub load_weights: Option<LoadWeightsConfig>,
}

fn default_lunch_boundary() -> usize {
    4
}

fn default_true() -> bool {
    true
}

/// Reference to the teacher(s) of a subject
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum TeacherReference {
    /// The same teacher for all levels
    Single(String),
    /// One teacher per level
    PerLevel(BTreeMap<String, String>),
    /// A list of teachers per level
    PerLevelList(BTreeMap<String, Vec<String>>),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClassConfig {
    pub name: String,
    /// Number of students
    #[serde(default)]
    pub capacity: u32,
    /// Level of the class. Defaults to the first two characters of the name.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub subgroups: Vec<SubgroupConfig>,
}

/// A part of a class, which does not attend some of the class' subjects
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SubgroupConfig {
    pub name: String,
    #[serde(default)]
    pub skipped_subjects: Vec<String>,
}

/// Unavailability of a teacher or room on some slots of a day
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Unavailability {
    /// Teacher id or room name
    pub who: String,
    pub day: String,
    pub slots: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FixedLesson {
    pub class: String,
    pub day: String,
    pub slot: String,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SyncRequest {
    pub level: String,
    pub subject: String,
}

/// Selection of classes a rule applies to
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassFilter {
    #[default]
    All,
    Level(String),
    Classes(Vec<String>),
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExcludeStrength {
    #[default]
    Strong,
    Weak,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncludeStrength {
    Strong,
    Medium,
    Weak,
}

/// `first` must not be directly followed by `then`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ExcludeFollowConfig {
    pub first: String,
    pub then: String,
    #[serde(default)]
    pub strength: ExcludeStrength,
    #[serde(default)]
    pub classes: ClassFilter,
}

/// `first` should be directly followed by `then`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IncludeFollowConfig {
    pub first: String,
    pub then: String,
    pub strengths: Vec<IncludeStrength>,
    #[serde(default)]
    pub target: u32,
    #[serde(default)]
    pub classes: ClassFilter,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LunchConfig {
    /// Number of students the cafeteria can serve in one slot
    pub capacity: u32,
    /// Share of each class' students eating at the cafeteria
    pub proportion: f64,
    /// Candidate lunch slots, in order of rotation
    pub slots: Vec<String>,
    /// Slot used by all classes if the cafeteria capacity suffices
    pub primary: String,
    /// Lunch slot per level, used if the capacity does not suffice and `priority_active` is set
    #[serde(default)]
    pub priority: BTreeMap<String, String>,
    #[serde(default)]
    pub priority_active: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoadScope {
    FullDay,
    HalfDay,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadLimitConfig {
    pub level: String,
    pub subject: String,
    pub max: u32,
    pub scope: LoadScope,
}

/// Exact number of lessons of some subjects within a window of one day
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TargetedConfig {
    #[serde(default)]
    pub classes: ClassFilter,
    pub subjects: Vec<String>,
    pub day: String,
    pub start: String,
    /// Last slot of the window (inclusive). Defaults to `start`.
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub count: Option<u32>,
}

/// Daily load ("cartable") weights and thresholds
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LoadWeightsConfig {
    /// Weight per subject name. Subjects without entry weigh nothing.
    pub weights: BTreeMap<String, f64>,
    /// Daily threshold per level
    #[serde(default)]
    pub thresholds: BTreeMap<String, f64>,
    /// Threshold for levels without entry in `thresholds`
    #[serde(default)]
    pub default_threshold: Option<f64>,
    /// Penalty multiplier for the load excess
    #[serde(default = "default_penalty_weight")]
    pub penalty_weight: i64,
}

fn default_penalty_weight() -> i64 {
    1
}

/// Read the timetable configuration from a JSON document
pub fn read<R: std::io::Read>(reader: R) -> Result<Configuration, String> {
    serde_json::from_reader(reader).map_err(|err| err.to_string())
}

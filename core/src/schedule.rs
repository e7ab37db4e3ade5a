//! Weekly class schedule aggregation.
//!
//! The backend is inconsistent about day names (`"Saturday"` in one place,
//! `"Sat"` in another), so every raw value is mapped through `DayKey` before
//! grouping. Values that match no weekday land in `DayKey::Unscheduled`,
//! which always sorts after the canonical week.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ClassScheduleItem, Semester};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn full_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    /// Parse a full day name or its three-letter abbreviation, ignoring case
    /// and surrounding whitespace.
    pub fn from_name(raw: &str) -> Option<Self> {
        let name = raw.trim().to_ascii_lowercase();
        let day = match name.as_str() {
            "monday" | "mon" => Weekday::Monday,
            "tuesday" | "tue" => Weekday::Tuesday,
            "wednesday" | "wed" => Weekday::Wednesday,
            "thursday" | "thu" => Weekday::Thursday,
            "friday" | "fri" => Weekday::Friday,
            "saturday" | "sat" => Weekday::Saturday,
            "sunday" | "sun" => Weekday::Sunday,
            _ => return None,
        };
        Some(day)
    }

    // Declaration order matches `ALL`.
    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.full_name())
    }
}

impl TryFrom<String> for Weekday {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Weekday::from_name(&value).ok_or_else(|| format!("unknown weekday `{value}`"))
    }
}

impl From<Weekday> for String {
    fn from(day: Weekday) -> Self {
        day.full_name().to_string()
    }
}

/// The seven days in display order, starting at `first_day`.
pub fn canonical_week(first_day: Weekday) -> [Weekday; 7] {
    let start = first_day.index();
    std::array::from_fn(|offset| Weekday::ALL[(start + offset) % 7])
}

/// Grouping key of a class session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DayKey {
    Day(Weekday),
    Unscheduled,
}

impl DayKey {
    pub fn normalize(raw: &str) -> Self {
        Weekday::from_name(raw).map_or(DayKey::Unscheduled, DayKey::Day)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayKey::Day(day) => day.full_name(),
            DayKey::Unscheduled => "Unscheduled",
        }
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<String> for DayKey {
    fn from(raw: String) -> Self {
        DayKey::normalize(&raw)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.label().to_string()
    }
}

/// Sessions of one day, in the order the backend returned them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayBucket {
    pub day: DayKey,
    pub sessions: Vec<ClassScheduleItem>,
}

/// Partition `sessions` into per-day buckets.
///
/// Buckets follow `order`, then `Unscheduled`; empty buckets are omitted.
/// A session whose day is missing from `order` is treated as unscheduled.
/// Relative input order is kept inside each bucket.
pub fn group_by_day(sessions: &[ClassScheduleItem], order: &[Weekday]) -> Vec<DayBucket> {
    let mut keys: Vec<DayKey> = Vec::with_capacity(order.len() + 1);
    for day in order {
        let key = DayKey::Day(*day);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.push(DayKey::Unscheduled);

    let mut grouped: HashMap<DayKey, Vec<ClassScheduleItem>> = HashMap::new();
    for session in sessions {
        let key = if keys.contains(&session.day) {
            session.day
        } else {
            DayKey::Unscheduled
        };
        grouped.entry(key).or_default().push(session.clone());
    }

    keys.into_iter()
        .filter_map(|day| grouped.remove(&day).map(|sessions| DayBucket { day, sessions }))
        .collect()
}

/// A season choice for the semester picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Season {
    pub id: u32,
    pub name: String,
}

/// Picker values derived from the semester list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SemesterOptions {
    /// Distinct years, newest first.
    pub years: Vec<i32>,
    /// Distinct seasons in first-seen order.
    pub seasons: Vec<Season>,
}

impl SemesterOptions {
    pub fn from_semesters(semesters: &[Semester]) -> Self {
        let mut years: Vec<i32> = Vec::new();
        let mut seasons: Vec<Season> = Vec::new();

        for semester in semesters {
            if !years.contains(&semester.year) {
                years.push(semester.year);
            }
            match seasons.iter_mut().find(|s| s.id == semester.season_id) {
                Some(season) => season.name = semester.season_name.clone(),
                None => seasons.push(Season {
                    id: semester.season_id,
                    name: semester.season_name.clone(),
                }),
            }
        }
        years.sort_unstable_by(|a, b| b.cmp(a));

        Self { years, seasons }
    }

    pub fn contains(&self, year: i32, season_id: u32) -> bool {
        self.years.contains(&year) && self.seasons.iter().any(|s| s.id == season_id)
    }
}

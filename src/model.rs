//! Core data types shared by the query, filter, and render stages.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Internal identifier of a tracked subject.
///
/// Doubles as the name of the subject's partition table in the GPS database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(String);

impl SubjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Partition table name: the id, lowercased.
    pub fn table_name(&self) -> String {
        self.0.to_lowercase()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked entity as stored in the `subjects` catalog table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    /// Name as stored in the catalog (lowercase in practice).
    pub name: String,
    pub hidden: bool,
}

impl Subject {
    /// Capitalization-normalized name used for lookup and display.
    pub fn display_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Trims, lowercases, then capitalizes the first character.
///
/// `"  tabby  "` and `"TABBY"` both become `"Tabby"`.
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// One GPS fix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSample {
    #[serde(rename = "timestamp_local")]
    pub timestamp: NaiveDateTime,
    #[serde(rename = "location_lat")]
    pub latitude: f64,
    #[serde(rename = "location_long")]
    pub longitude: f64,
    #[serde(rename = "gps_hdop")]
    pub hdop: f64,
}

impl LocationSample {
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// Outlier-filtered samples for one subject on one date, sorted by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredTrack {
    pub subject_id: SubjectId,
    pub date: NaiveDate,
    samples: Vec<LocationSample>,
}

impl FilteredTrack {
    /// Builds a track, restoring timestamp order.
    pub fn new(subject_id: SubjectId, date: NaiveDate, mut samples: Vec<LocationSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            subject_id,
            date,
            samples,
        }
    }

    pub fn samples(&self) -> &[LocationSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// First and last time of day present in the track, `None` when empty.
    pub fn time_span(&self) -> Option<TimeSpan> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        Some(TimeSpan {
            first: first.time(),
            last: last.time(),
        })
    }
}

/// Caption pair: earliest and latest time of day in a filtered track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
    pub first: NaiveTime,
    pub last: NaiveTime,
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Showing tracking points between {} and {}",
            self.first, self.last
        )
    }
}

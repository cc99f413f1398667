//! Rows of the `detections` and `watch_list` tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome stored with each detection.
///
/// The column is free text. Rows written by the web dashboard use
/// `allowed`, `blocked` and `error`; anything else is kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DetectionStatus {
    Match,
    NoMatch,
    Allowed,
    Blocked,
    Error,
    Other(String),
}

impl DetectionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            DetectionStatus::Match => "match",
            DetectionStatus::NoMatch => "no_match",
            DetectionStatus::Allowed => "allowed",
            DetectionStatus::Blocked => "blocked",
            DetectionStatus::Error => "error",
            DetectionStatus::Other(status) => status,
        }
    }

    /// The plate was read, whether or not it was on the watch list.
    pub fn is_success(&self) -> bool {
        matches!(self, DetectionStatus::Match | DetectionStatus::NoMatch | DetectionStatus::Allowed)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DetectionStatus::Blocked | DetectionStatus::Error)
    }
}

impl From<String> for DetectionStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "match" => DetectionStatus::Match,
            "no_match" => DetectionStatus::NoMatch,
            "allowed" => DetectionStatus::Allowed,
            "blocked" => DetectionStatus::Blocked,
            "error" => DetectionStatus::Error,
            _ => DetectionStatus::Other(status),
        }
    }
}

impl From<DetectionStatus> for String {
    fn from(status: DetectionStatus) -> Self {
        match status {
            DetectionStatus::Other(status) => status,
            known => known.as_str().to_string(),
        }
    }
}

/// Status column of `watch_list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    NotDetected,
    Detected,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchStatus::NotDetected => "not_detected",
            WatchStatus::Detected => "detected",
        }
    }
}

/// A stored detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub plate_number: String,
    pub confidence: f64,
    pub status: DetectionStatus,
    pub time_ms: f64,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Insert payload for `detections`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDetection {
    pub plate_number: String,
    pub confidence: f64,
    pub status: DetectionStatus,
    pub time_ms: f64,
    pub user_id: String,
}

/// A stored watch list row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchListEntry {
    pub plate_number: String,
    #[serde(default)]
    pub status: WatchStatus,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for `watch_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWatchListEntry {
    pub plate_number: String,
    pub status: WatchStatus,
    pub user_id: String,
}

/// Plate numbers being watched, compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WatchList {
    plates: HashSet<String>,
}

impl WatchList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plate: &str) -> bool {
        let normalized = normalize_plate(plate);
        if normalized.is_empty() {
            return false;
        }
        self.plates.insert(normalized)
    }

    pub fn contains(&self, plate: &str) -> bool {
        self.plates.contains(&normalize_plate(plate))
    }

    pub fn status_for(&self, plate: &str) -> DetectionStatus {
        if self.contains(plate) {
            DetectionStatus::Match
        } else {
            DetectionStatus::NoMatch
        }
    }

    pub fn len(&self) -> usize {
        self.plates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plates.is_empty()
    }
}

impl<'a> FromIterator<&'a WatchListEntry> for WatchList {
    fn from_iter<T: IntoIterator<Item = &'a WatchListEntry>>(iter: T) -> Self {
        let mut list = Self::new();
        for entry in iter {
            list.insert(&entry.plate_number);
        }
        list
    }
}

/// Summary of recently stored detections, as shown next to the history.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct HistoryStats {
    pub recent: usize,
    pub successful: usize,
    pub failed: usize,
    /// Share of recent rows that were read successfully, in percent
    pub accuracy: f64,
}

impl HistoryStats {
    pub fn from_records(records: &[DetectionRecord]) -> Self {
        let recent = records.len();
        let successful = records.iter().filter(|r| r.status.is_success()).count();
        let failed = records.iter().filter(|r| r.status.is_failure()).count();
        let accuracy = if recent > 0 {
            successful as f64 / recent as f64 * 100.0
        } else {
            0.0
        };

        Self {
            recent,
            successful,
            failed,
            accuracy,
        }
    }
}

/// Uppercase without surrounding whitespace, the form plates are stored in.
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

//! Derived timeline model.
//!
//! Timeline events are never persisted; they are rebuilt from card
//! documents on every request and their ids are fresh per rebuild.

use crate::model::card::CardId;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of lifecycle moment represented by a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    CardCreated,
    CardDeleted,
    TitleChanged,
    TodoAdded,
    TodoRemoved,
    TodoModified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub event_id: String,
    pub event_type: TimelineEventType,
    pub card_id: CardId,
    /// Current title of the card, not the title at event time.
    pub card_title: String,
    /// Unix epoch milliseconds.
    pub event_time: i64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Map<String, Value>>,
}

/// Optional inclusive time bounds, in epoch milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeWindow {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    /// Returns whether `time_ms` falls inside every supplied bound.
    pub fn contains(&self, time_ms: i64) -> bool {
        self.start.map_or(true, |start| time_ms >= start)
            && self.end.map_or(true, |end| time_ms <= end)
    }

    /// Parses ISO-8601 bounds.
    ///
    /// Accepts RFC 3339 (`Z` or explicit offset), naive date-times with or
    /// without seconds, and bare dates (start of day). Naive inputs are read
    /// as UTC. Returns the offending input on failure.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, String> {
        Ok(Self {
            start: start.map(parse_iso_millis).transpose()?,
            end: end.map(parse_iso_millis).transpose()?,
        })
    }
}

fn parse_iso_millis(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.timestamp_millis());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
        .ok_or_else(|| trimmed.to_string())
}

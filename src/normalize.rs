//! Field normalization for presentation records

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Serialize, Serializer};

use crate::types::RunConclusion;

/// Titles longer than this are truncated
pub const TITLE_MAX_LEN: usize = 37;

/// Characters kept from a truncated title
pub const TITLE_KEEP_LEN: usize = 34;

/// Appended to truncated titles
pub const ELLIPSIS: &str = "...";

/// Shown when a run has no conclusion yet
pub const NONE_MARKER: &str = "-";

/// Display format for parsed start times, e.g. `01. Jan 10:00`
pub const START_TIME_FORMAT: &str = "%d. %b %H:%M";

/// Shorten a title to at most [`TITLE_MAX_LEN`] characters
///
/// Lengths are counted in Unicode scalar values so multi-byte titles are
/// never split inside a character.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= TITLE_MAX_LEN {
        return title.to_string();
    }
    let mut short: String = title.chars().take(TITLE_KEEP_LEN).collect();
    short.push_str(ELLIPSIS);
    short
}

/// Conclusion label, or [`NONE_MARKER`] when absent
pub fn conclusion_label(conclusion: Option<RunConclusion>) -> &'static str {
    conclusion.map_or(NONE_MARKER, |c| c.label())
}

/// Normalized run start time
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartTime {
    /// The API returned no start time
    Missing,
    /// Parsed instant, converted to the local time zone
    At(DateTime<Local>),
    /// Unparseable value, kept verbatim
    Raw(String),
}

impl StartTime {
    /// Parse an ISO-8601 timestamp, keeping the raw string on failure
    ///
    /// Timestamps without an offset are interpreted in the local zone.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return StartTime::Missing;
        };

        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return StartTime::At(dt.with_timezone(&Local));
        }

        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).earliest())
            .map(StartTime::At)
            .unwrap_or_else(|| StartTime::Raw(raw.to_string()))
    }

    /// Human-facing form: formatted instant, raw string, or empty
    pub fn display(&self) -> String {
        match self {
            StartTime::Missing => String::new(),
            StartTime::At(dt) => dt.format(START_TIME_FORMAT).to_string(),
            StartTime::Raw(raw) => raw.clone(),
        }
    }

    /// Key used for the global ordering of records
    pub fn sort_key(&self) -> SortKey {
        match self {
            StartTime::Missing => SortKey::Text(String::new()),
            StartTime::At(dt) => SortKey::Instant(dt.with_timezone(&Utc)),
            StartTime::Raw(raw) => SortKey::Text(raw.clone()),
        }
    }
}

impl Serialize for StartTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            StartTime::Missing => serializer.serialize_none(),
            StartTime::At(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            StartTime::Raw(raw) => serializer.serialize_str(raw),
        }
    }
}

/// Total order over start times
///
/// Text keys (missing as the empty string, then unparseable values
/// lexicographically) sort before parsed instants, which sort
/// chronologically.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    /// Missing or unparseable start time
    Text(String),
    /// Parsed start time
    Instant(DateTime<Utc>),
}

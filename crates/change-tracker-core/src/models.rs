//! Core data models used throughout Change Tracker.
//!
//! [`Snapshot`]s and [`ChangeRecord`]s come from the persistence layer.
//! Everything else is derived on demand by the diff and aggregation
//! modules and discarded once rendered.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One capture of a competitor page's observable content.
///
/// Field names on the wire follow the upstream scraper's columns
/// (`h1`, `content`, `keywords_found`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub competitor: String,
    pub url: String,
    pub captured_at: NaiveDateTime,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "h1")]
    pub heading_text: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "content")]
    pub body_text: Option<String>,
    /// Raw `"<keyword> - <N> разів, ..."` string as produced upstream.
    #[serde(default, rename = "keywords_found")]
    pub keyword_occurrences: Option<String>,
}

impl Snapshot {
    /// SHA-256 of the body text, used to skip content diffs on unchanged pages.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.body_text.as_deref().unwrap_or("").as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// A normalized keyword ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u64,
}

/// A scalar field whose trimmed value differs between two snapshots.
///
/// Values are recorded as found on the snapshots, so an absent field stays
/// `None` rather than the empty string it was compared as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Change of a single keyword's occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeywordDelta {
    Added {
        keyword: String,
        new_count: u64,
    },
    Removed {
        keyword: String,
        old_count: u64,
    },
    Changed {
        keyword: String,
        old_count: u64,
        new_count: u64,
    },
}

impl KeywordDelta {
    pub fn keyword(&self) -> &str {
        match self {
            KeywordDelta::Added { keyword, .. }
            | KeywordDelta::Removed { keyword, .. }
            | KeywordDelta::Changed { keyword, .. } => keyword,
        }
    }

    /// Count before the change, 0 for [`KeywordDelta::Added`].
    pub fn old_count(&self) -> u64 {
        match self {
            KeywordDelta::Added { .. } => 0,
            KeywordDelta::Removed { old_count, .. } | KeywordDelta::Changed { old_count, .. } => {
                *old_count
            }
        }
    }

    /// Count after the change, 0 for [`KeywordDelta::Removed`].
    pub fn new_count(&self) -> u64 {
        match self {
            KeywordDelta::Removed { .. } => 0,
            KeywordDelta::Added { new_count, .. } | KeywordDelta::Changed { new_count, .. } => {
                *new_count
            }
        }
    }
}

/// Alignment status of one line in a content diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStatus {
    Unchanged,
    Added,
    Removed,
    /// A single removed line directly followed by a single added line.
    Replaced,
}

/// One row of a line-level content diff. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentDiffLine {
    pub status: LineStatus,
    pub old_line: Option<String>,
    pub new_line: Option<String>,
    pub old_line_number: Option<usize>,
    pub new_line_number: Option<usize>,
}

/// A change timestamp for a competitor page, as stored.
///
/// `changed_at` stays a raw string: parsing happens in the aggregator so a
/// single bad value only drops that one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub competitor: String,
    pub url: String,
    pub changed_at: String,
}

impl AsRef<str> for ChangeEvent {
    fn as_ref(&self) -> &str {
        &self.changed_at
    }
}

/// A persisted field change, the row behind every [`ChangeEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub competitor: String,
    pub url: String,
    pub field_changed: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub change_date: String,
    pub old_keywords_count: Option<u64>,
    pub new_keywords_count: Option<u64>,
}

impl ChangeRecord {
    pub fn event(&self) -> ChangeEvent {
        ChangeEvent {
            competitor: self.competitor.clone(),
            url: self.url.clone(),
            changed_at: self.change_date.clone(),
        }
    }
}

/// One day of an activity calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub event_count: u32,
    /// Heatmap level in `0..=4`.
    pub level: u8,
}

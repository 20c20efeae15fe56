//! Storage abstraction for Change Tracker.
//!
//! The [`SnapshotStore`] trait is the persistence boundary: it supplies
//! snapshot pairs and change event streams to the pure differs and the
//! activity aggregator, and stores the change records produced on ingest.
//! Diff reports and calendars themselves are never stored.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::activity::parse_event_date;
use crate::models::{ChangeEvent, ChangeRecord, Snapshot};

/// Selection of change records. All bounds are optional and inclusive.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    pub competitor: Option<String>,
    pub url: Option<String>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
}

impl ChangeFilter {
    pub fn for_page(competitor: &str, url: Option<&str>) -> Self {
        Self {
            competitor: Some(competitor.to_string()),
            url: url.map(str::to_string),
            ..Self::default()
        }
    }

    /// Whether `record` passes every bound.
    ///
    /// With a date bound set, records whose `change_date` does not parse
    /// are excluded.
    pub fn matches(&self, record: &ChangeRecord) -> bool {
        if self.competitor.as_deref().is_some_and(|c| c != record.competitor) {
            return false;
        }
        if self.url.as_deref().is_some_and(|u| u != record.url) {
            return false;
        }
        if self.since.is_none() && self.until.is_none() {
            return true;
        }
        match parse_event_date(&record.change_date) {
            Some(date) => {
                self.since.map_or(true, |since| date >= since)
                    && self.until.map_or(true, |until| date <= until)
            }
            None => false,
        }
    }
}

/// Abstract storage backend for snapshots and change records.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`insert_snapshot`](SnapshotStore::insert_snapshot) | Store a capture (replacing one with the same key) |
/// | [`insert_with_changes`](SnapshotStore::insert_with_changes) | Store a new capture and its change records atomically |
/// | [`previous_snapshot`](SnapshotStore::previous_snapshot) | Latest capture of a page before a time |
/// | [`get_snapshot`](SnapshotStore::get_snapshot) | Capture of a page at an exact time |
/// | [`snapshots`](SnapshotStore::snapshots) | All captures of a page, oldest first |
/// | [`competitors`](SnapshotStore::competitors) / [`pages`](SnapshotStore::pages) / [`capture_times`](SnapshotStore::capture_times) | Navigation listings |
/// | [`record_changes`](SnapshotStore::record_changes) | Append change records |
/// | [`change_records`](SnapshotStore::change_records) | Query change records |
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert a snapshot, keyed by (competitor, url, captured_at).
    ///
    /// Returns the stored snapshot's ID.
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<String>;

    /// Insert a snapshot together with the change records derived from it.
    ///
    /// Either both are written or neither is. Returns how many records were
    /// written.
    async fn insert_with_changes(
        &self,
        snapshot: &Snapshot,
        records: &[ChangeRecord],
    ) -> Result<usize>;

    /// The most recent snapshot of a page strictly before `before`.
    async fn previous_snapshot(
        &self,
        competitor: &str,
        url: &str,
        before: NaiveDateTime,
    ) -> Result<Option<Snapshot>>;

    async fn get_snapshot(
        &self,
        competitor: &str,
        url: &str,
        captured_at: NaiveDateTime,
    ) -> Result<Option<Snapshot>>;

    /// All snapshots of a page ordered by capture time.
    async fn snapshots(&self, competitor: &str, url: &str) -> Result<Vec<Snapshot>>;

    /// Distinct competitors, sorted.
    async fn competitors(&self) -> Result<Vec<String>>;

    /// Distinct page URLs of a competitor, sorted.
    async fn pages(&self, competitor: &str) -> Result<Vec<String>>;

    /// Capture times of a page, ascending.
    async fn capture_times(&self, competitor: &str, url: &str) -> Result<Vec<NaiveDateTime>>;

    /// Append change records. Returns how many were written.
    async fn record_changes(&self, records: &[ChangeRecord]) -> Result<usize>;

    /// Change records passing `filter`, ordered by change date.
    async fn change_records(&self, filter: &ChangeFilter) -> Result<Vec<ChangeRecord>>;

    /// Change events of a competitor, optionally narrowed to one page.
    async fn change_events(&self, competitor: &str, url: Option<&str>) -> Result<Vec<ChangeEvent>> {
        let filter = ChangeFilter::for_page(competitor, url);
        Ok(self
            .change_records(&filter)
            .await?
            .iter()
            .map(ChangeRecord::event)
            .collect())
    }
}

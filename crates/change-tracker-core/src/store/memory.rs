//! In-memory [`SnapshotStore`] implementation for testing and WASM targets.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Lookups are linear scans.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::models::{ChangeRecord, Snapshot};

use super::{ChangeFilter, SnapshotStore};

struct StoredSnapshot {
    id: String,
    snapshot: Snapshot,
}

/// In-memory store for testing and WASM environments.
pub struct InMemoryStore {
    snapshots: RwLock<Vec<StoredSnapshot>>,
    changes: RwLock<Vec<ChangeRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            changes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn same_page(snap: &Snapshot, competitor: &str, url: &str) -> bool {
    snap.competitor == competitor && snap.url == url
}

fn upsert(stored: &mut Vec<StoredSnapshot>, snapshot: &Snapshot) -> String {
    if let Some(existing) = stored.iter_mut().find(|s| {
        same_page(&s.snapshot, &snapshot.competitor, &snapshot.url)
            && s.snapshot.captured_at == snapshot.captured_at
    }) {
        existing.snapshot = snapshot.clone();
        return existing.id.clone();
    }
    let id = format!("mem-{}", stored.len() + 1);
    stored.push(StoredSnapshot {
        id: id.clone(),
        snapshot: snapshot.clone(),
    });
    id
}

#[async_trait]
impl SnapshotStore for InMemoryStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<String> {
        let mut stored = write(&self.snapshots)?;
        Ok(upsert(&mut stored, snapshot))
    }

    async fn insert_with_changes(
        &self,
        snapshot: &Snapshot,
        records: &[ChangeRecord],
    ) -> Result<usize> {
        // Both locks are taken before either vector is touched.
        let mut stored = write(&self.snapshots)?;
        let mut changes = write(&self.changes)?;
        upsert(&mut stored, snapshot);
        changes.extend_from_slice(records);
        Ok(records.len())
    }

    async fn previous_snapshot(
        &self,
        competitor: &str,
        url: &str,
        before: NaiveDateTime,
    ) -> Result<Option<Snapshot>> {
        let stored = read(&self.snapshots)?;
        Ok(stored
            .iter()
            .map(|s| &s.snapshot)
            .filter(|s| same_page(s, competitor, url) && s.captured_at < before)
            .max_by_key(|s| s.captured_at)
            .cloned())
    }

    async fn get_snapshot(
        &self,
        competitor: &str,
        url: &str,
        captured_at: NaiveDateTime,
    ) -> Result<Option<Snapshot>> {
        let stored = read(&self.snapshots)?;
        Ok(stored
            .iter()
            .map(|s| &s.snapshot)
            .find(|s| same_page(s, competitor, url) && s.captured_at == captured_at)
            .cloned())
    }

    async fn snapshots(&self, competitor: &str, url: &str) -> Result<Vec<Snapshot>> {
        let stored = read(&self.snapshots)?;
        let mut snaps: Vec<Snapshot> = stored
            .iter()
            .map(|s| &s.snapshot)
            .filter(|s| same_page(s, competitor, url))
            .cloned()
            .collect();
        snaps.sort_by_key(|s| s.captured_at);
        Ok(snaps)
    }

    async fn competitors(&self) -> Result<Vec<String>> {
        let stored = read(&self.snapshots)?;
        let names: BTreeSet<String> = stored
            .iter()
            .map(|s| s.snapshot.competitor.clone())
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn pages(&self, competitor: &str) -> Result<Vec<String>> {
        let stored = read(&self.snapshots)?;
        let urls: BTreeSet<String> = stored
            .iter()
            .filter(|s| s.snapshot.competitor == competitor)
            .map(|s| s.snapshot.url.clone())
            .collect();
        Ok(urls.into_iter().collect())
    }

    async fn capture_times(&self, competitor: &str, url: &str) -> Result<Vec<NaiveDateTime>> {
        let stored = read(&self.snapshots)?;
        let times: BTreeSet<NaiveDateTime> = stored
            .iter()
            .filter(|s| same_page(&s.snapshot, competitor, url))
            .map(|s| s.snapshot.captured_at)
            .collect();
        Ok(times.into_iter().collect())
    }

    async fn record_changes(&self, records: &[ChangeRecord]) -> Result<usize> {
        let mut changes = write(&self.changes)?;
        changes.extend_from_slice(records);
        Ok(records.len())
    }

    async fn change_records(&self, filter: &ChangeFilter) -> Result<Vec<ChangeRecord>> {
        let changes = read(&self.changes)?;
        let mut matching: Vec<ChangeRecord> = changes
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.change_date.cmp(&b.change_date));
        Ok(matching)
    }
}

//! Snapshot ingestion.
//!
//! Loads captures produced by the scraper, stores them, and compares each
//! new capture with the previous one of the same page to record change
//! events. Captures are processed oldest first so a batch covering several
//! days produces the same records as ingesting each day separately.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Timelike;
use tracing::{debug, info};

use change_tracker_core::fields::SnapshotField;
use change_tracker_core::keywords::KeywordGrammar;
use change_tracker_core::models::Snapshot;
use change_tracker_core::report::detect_changes;
use change_tracker_core::store::SnapshotStore;

use crate::config::Config;
use crate::db;

/// Counters reported after an ingest run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub read: usize,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub changes_recorded: usize,
}

/// Parse a JSON array of snapshots.
pub fn parse_snapshots(json: &str) -> Result<Vec<Snapshot>> {
    serde_json::from_str(json).context("Failed to parse snapshot JSON (expected an array)")
}

/// Store `snapshots` and record change events against earlier captures.
///
/// A capture whose key already exists is replaced when its content differs
/// and skipped otherwise. Change events are only derived for new captures,
/// and each new capture is stored together with its events so a failed run
/// can be repeated.
pub async fn ingest_snapshots<S: SnapshotStore + ?Sized>(
    store: &S,
    grammar: &KeywordGrammar,
    fields: &[SnapshotField],
    mut snapshots: Vec<Snapshot>,
) -> Result<IngestStats> {
    // Capture times are stored with second precision.
    for snap in &mut snapshots {
        snap.captured_at = snap
            .captured_at
            .with_nanosecond(0)
            .unwrap_or(snap.captured_at);
    }
    snapshots.sort_by(|a, b| {
        (&a.competitor, &a.url, a.captured_at).cmp(&(&b.competitor, &b.url, b.captured_at))
    });

    let mut stats = IngestStats {
        read: snapshots.len(),
        ..IngestStats::default()
    };

    for snap in &snapshots {
        if let Some(existing) = store
            .get_snapshot(&snap.competitor, &snap.url, snap.captured_at)
            .await?
        {
            if existing == *snap {
                stats.unchanged += 1;
            } else {
                store.insert_snapshot(snap).await?;
                stats.updated += 1;
            }
            continue;
        }

        let previous = store
            .previous_snapshot(&snap.competitor, &snap.url, snap.captured_at)
            .await?;
        let records = match &previous {
            Some(previous) => detect_changes(grammar, previous, snap, fields),
            None => {
                debug!(competitor = %snap.competitor, url = %snap.url, "first capture of page");
                Vec::new()
            }
        };

        stats.changes_recorded += store.insert_with_changes(snap, &records).await?;
        stats.inserted += 1;
    }

    Ok(stats)
}

pub async fn run_ingest(config: &Config, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot file: {}", path.display()))?;
    let snapshots = parse_snapshots(&json)?;
    let grammar = config.grammar()?;
    let fields = config.tracked_fields()?;

    let store = db::open_store(config).await?;
    let stats = ingest_snapshots(&store, &grammar, &fields, snapshots).await?;
    store.close().await;

    info!(
        inserted = stats.inserted,
        changes = stats.changes_recorded,
        "ingest finished"
    );

    println!("ingest {}", path.display());
    println!("  snapshots read: {}", stats.read);
    println!("  inserted: {}", stats.inserted);
    println!("  updated: {}", stats.updated);
    println!("  unchanged: {}", stats.unchanged);
    println!("  changes recorded: {}", stats.changes_recorded);
    println!("ok");

    Ok(())
}

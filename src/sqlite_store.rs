//! SQLite-backed [`SnapshotStore`] implementation.
//!
//! Snapshots live in the `snapshots` table with capture times stored as
//! Unix seconds. Change records live in `content_changes`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use change_tracker_core::models::{ChangeRecord, Snapshot};
use change_tracker_core::store::{ChangeFilter, SnapshotStore};

/// SQLite implementation of the [`SnapshotStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

fn to_ts(at: NaiveDateTime) -> i64 {
    at.and_utc().timestamp()
}

fn from_ts(ts: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow!("capture time out of range: {}", ts))
}

fn count_to_db(count: Option<u64>) -> Option<i64> {
    count.map(|c| i64::try_from(c).unwrap_or(i64::MAX))
}

fn count_from_db(count: Option<i64>) -> Option<u64> {
    count.and_then(|c| u64::try_from(c).ok())
}

const SNAPSHOT_COLUMNS: &str =
    "competitor, url, captured_at, title, h1, description, content, keywords_found";

fn snapshot_from_row(row: &SqliteRow) -> Result<Snapshot> {
    Ok(Snapshot {
        competitor: row.get("competitor"),
        url: row.get("url"),
        captured_at: from_ts(row.get("captured_at"))?,
        title: row.get("title"),
        heading_text: row.get("h1"),
        description: row.get("description"),
        body_text: row.get("content"),
        keyword_occurrences: row.get("keywords_found"),
    })
}

fn change_from_row(row: &SqliteRow) -> ChangeRecord {
    ChangeRecord {
        competitor: row.get("competitor_name"),
        url: row.get("url"),
        field_changed: row.get("field_changed"),
        old_value: row.get("old_value"),
        new_value: row.get("new_value"),
        change_date: row.get("change_date"),
        old_keywords_count: count_from_db(row.get("old_keywords_count")),
        new_keywords_count: count_from_db(row.get("new_keywords_count")),
    }
}

async fn upsert_snapshot(conn: &mut SqliteConnection, snapshot: &Snapshot) -> Result<String> {
    let captured_at = to_ts(snapshot.captured_at);

    let existing_id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM snapshots WHERE competitor = ? AND url = ? AND captured_at = ?",
    )
    .bind(&snapshot.competitor)
    .bind(&snapshot.url)
    .bind(captured_at)
    .fetch_optional(&mut *conn)
    .await?;

    let id = existing_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    sqlx::query(
        r#"
        INSERT INTO snapshots (id, competitor, url, captured_at, title, h1, description,
                               content, keywords_found, content_hash)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(competitor, url, captured_at) DO UPDATE SET
            title = excluded.title,
            h1 = excluded.h1,
            description = excluded.description,
            content = excluded.content,
            keywords_found = excluded.keywords_found,
            content_hash = excluded.content_hash
        "#,
    )
    .bind(&id)
    .bind(&snapshot.competitor)
    .bind(&snapshot.url)
    .bind(captured_at)
    .bind(&snapshot.title)
    .bind(&snapshot.heading_text)
    .bind(&snapshot.description)
    .bind(&snapshot.body_text)
    .bind(&snapshot.keyword_occurrences)
    .bind(snapshot.content_hash())
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

async fn insert_changes(conn: &mut SqliteConnection, records: &[ChangeRecord]) -> Result<usize> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO content_changes (competitor_name, url, field_changed, old_value,
                                         new_value, change_date, old_keywords_count,
                                         new_keywords_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.competitor)
        .bind(&record.url)
        .bind(&record.field_changed)
        .bind(&record.old_value)
        .bind(&record.new_value)
        .bind(&record.change_date)
        .bind(count_to_db(record.old_keywords_count))
        .bind(count_to_db(record.new_keywords_count))
        .execute(&mut *conn)
        .await?;
    }
    Ok(records.len())
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<String> {
        let mut tx = self.pool.begin().await?;
        let id = upsert_snapshot(&mut *tx, snapshot).await?;
        tx.commit().await?;
        Ok(id)
    }

    async fn insert_with_changes(
        &self,
        snapshot: &Snapshot,
        records: &[ChangeRecord],
    ) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        upsert_snapshot(&mut *tx, snapshot).await?;
        let written = insert_changes(&mut *tx, records).await?;
        tx.commit().await?;
        Ok(written)
    }

    async fn previous_snapshot(
        &self,
        competitor: &str,
        url: &str,
        before: NaiveDateTime,
    ) -> Result<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM snapshots
             WHERE competitor = ? AND url = ? AND captured_at < ?
             ORDER BY captured_at DESC LIMIT 1",
            SNAPSHOT_COLUMNS
        ))
        .bind(competitor)
        .bind(url)
        .bind(to_ts(before))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn get_snapshot(
        &self,
        competitor: &str,
        url: &str,
        captured_at: NaiveDateTime,
    ) -> Result<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM snapshots WHERE competitor = ? AND url = ? AND captured_at = ?",
            SNAPSHOT_COLUMNS
        ))
        .bind(competitor)
        .bind(url)
        .bind(to_ts(captured_at))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(snapshot_from_row).transpose()
    }

    async fn snapshots(&self, competitor: &str, url: &str) -> Result<Vec<Snapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM snapshots WHERE competitor = ? AND url = ? ORDER BY captured_at",
            SNAPSHOT_COLUMNS
        ))
        .bind(competitor)
        .bind(url)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(snapshot_from_row).collect()
    }

    async fn competitors(&self) -> Result<Vec<String>> {
        let names: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT competitor FROM snapshots ORDER BY competitor")
                .fetch_all(&self.pool)
                .await?;
        Ok(names)
    }

    async fn pages(&self, competitor: &str) -> Result<Vec<String>> {
        let urls: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT url FROM snapshots WHERE competitor = ? ORDER BY url",
        )
        .bind(competitor)
        .fetch_all(&self.pool)
        .await?;
        Ok(urls)
    }

    async fn capture_times(&self, competitor: &str, url: &str) -> Result<Vec<NaiveDateTime>> {
        let stamps: Vec<i64> = sqlx::query_scalar(
            "SELECT captured_at FROM snapshots WHERE competitor = ? AND url = ? ORDER BY captured_at",
        )
        .bind(competitor)
        .bind(url)
        .fetch_all(&self.pool)
        .await?;

        stamps.into_iter().map(from_ts).collect()
    }

    async fn record_changes(&self, records: &[ChangeRecord]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let written = insert_changes(&mut *tx, records).await?;
        tx.commit().await?;
        Ok(written)
    }

    async fn change_records(&self, filter: &ChangeFilter) -> Result<Vec<ChangeRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT competitor_name, url, field_changed, old_value, new_value, change_date,
                   old_keywords_count, new_keywords_count
            FROM content_changes
            WHERE (? IS NULL OR competitor_name = ?)
              AND (? IS NULL OR url = ?)
            ORDER BY change_date, id
            "#,
        )
        .bind(&filter.competitor)
        .bind(&filter.competitor)
        .bind(&filter.url)
        .bind(&filter.url)
        .fetch_all(&self.pool)
        .await?;

        // Date bounds are checked after parsing since change_date is free text.
        Ok(rows
            .iter()
            .map(change_from_row)
            .filter(|record| filter.matches(record))
            .collect())
    }
}

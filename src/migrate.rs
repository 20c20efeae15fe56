use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the tables and indexes if they do not exist yet.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Page captures, one row per (competitor, url, capture time)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            id TEXT PRIMARY KEY,
            competitor TEXT NOT NULL,
            url TEXT NOT NULL,
            captured_at INTEGER NOT NULL,
            title TEXT,
            h1 TEXT,
            description TEXT,
            content TEXT,
            keywords_found TEXT,
            content_hash TEXT NOT NULL,
            UNIQUE(competitor, url, captured_at)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Change events detected on ingest
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_changes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            competitor_name TEXT NOT NULL,
            url TEXT NOT NULL,
            field_changed TEXT NOT NULL,
            old_value TEXT,
            new_value TEXT,
            change_date TEXT NOT NULL,
            old_keywords_count INTEGER,
            new_keywords_count INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_page ON snapshots(competitor, url, captured_at)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_changes_page ON content_changes(competitor_name, url)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_changes_date ON content_changes(change_date)")
        .execute(pool)
        .await?;

    Ok(())
}

//! `ctrack changes`: list recorded change events.

use anyhow::{Context, Result};
use chrono::NaiveDate;

use change_tracker_core::models::ChangeRecord;
use change_tracker_core::store::{ChangeFilter, SnapshotStore};

use crate::config::Config;
use crate::db;

fn parse_day(raw: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid {} date '{}'. Use YYYY-MM-DD.", flag, raw))
}

/// Build a filter from the command-line arguments.
pub fn build_filter(
    competitor: Option<&str>,
    url: Option<&str>,
    since: Option<&str>,
    until: Option<&str>,
) -> Result<ChangeFilter> {
    let filter = ChangeFilter {
        competitor: competitor.map(str::to_string),
        url: url.map(str::to_string),
        since: since.map(|s| parse_day(s, "--since")).transpose()?,
        until: until.map(|s| parse_day(s, "--until")).transpose()?,
    };
    if let (Some(since), Some(until)) = (filter.since, filter.until) {
        if since > until {
            anyhow::bail!("--since {} is after --until {}", since, until);
        }
    }
    Ok(filter)
}

fn cell(value: Option<&str>, width: usize) -> String {
    let value = value.unwrap_or("-").replace('\n', " ");
    if value.chars().count() <= width {
        return value;
    }
    let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn print_table(records: &[ChangeRecord]) {
    if records.is_empty() {
        println!("No changes found.");
        return;
    }
    println!(
        "{:<19}  {:<20}  {:<30}  {:<14}  {:<24}  {:<24}",
        "DATE", "COMPETITOR", "URL", "FIELD", "OLD", "NEW"
    );
    for r in records {
        println!(
            "{:<19}  {:<20}  {:<30}  {:<14}  {:<24}  {:<24}",
            r.change_date,
            cell(Some(&r.competitor), 20),
            cell(Some(&r.url), 30),
            r.field_changed,
            cell(r.old_value.as_deref(), 24),
            cell(r.new_value.as_deref(), 24),
        );
    }
    println!();
    println!("{} change(s)", records.len());
}

pub async fn run_changes(config: &Config, filter: &ChangeFilter, json: bool) -> Result<()> {
    let store = db::open_store(config).await?;
    let records = store.change_records(filter).await?;
    store.close().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print_table(&records);
    }
    Ok(())
}

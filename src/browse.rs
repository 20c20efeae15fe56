//! Navigation listings: competitors, their pages, and capture times.

use anyhow::Result;

use change_tracker_core::report::CHANGE_DATE_FORMAT;
use change_tracker_core::store::SnapshotStore;

use crate::config::Config;
use crate::db;

fn print_list(items: &[String], empty: &str) {
    if items.is_empty() {
        println!("{}", empty);
    }
    for item in items {
        println!("{}", item);
    }
}

pub async fn list_competitors(config: &Config) -> Result<()> {
    let store = db::open_store(config).await?;
    let names = store.competitors().await?;
    store.close().await;
    print_list(&names, "No competitors found.");
    Ok(())
}

pub async fn list_pages(config: &Config, competitor: &str) -> Result<()> {
    let store = db::open_store(config).await?;
    let urls = store.pages(competitor).await?;
    store.close().await;
    print_list(&urls, "No pages found.");
    Ok(())
}

pub async fn list_dates(config: &Config, competitor: &str, url: &str) -> Result<()> {
    let store = db::open_store(config).await?;
    let times = store.capture_times(competitor, url).await?;
    store.close().await;
    let formatted: Vec<String> = times
        .iter()
        .map(|t| t.format(CHANGE_DATE_FORMAT).to_string())
        .collect();
    print_list(&formatted, "No captures found.");
    Ok(())
}

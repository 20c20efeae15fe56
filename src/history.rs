//! `ctrack keywords`: keyword occurrence history for one page.

use anyhow::{bail, Result};
use serde::Serialize;

use change_tracker_core::keywords::{
    keyword_history, ranked, snapshot_keywords, KeywordGrammar, KeywordPoint,
};
use change_tracker_core::models::{KeywordCount, Snapshot};
use change_tracker_core::report::CHANGE_DATE_FORMAT;
use change_tracker_core::store::SnapshotStore;

use crate::config::Config;
use crate::db;

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum KeywordsOutput {
    History {
        keyword: String,
        points: Vec<KeywordPoint>,
    },
    Latest {
        captured_at: String,
        keywords: Vec<KeywordCount>,
    },
}

/// Ledger of the newest capture, highest counts first.
pub fn latest_keywords(grammar: &KeywordGrammar, snapshots: &[Snapshot]) -> Vec<KeywordCount> {
    snapshots
        .iter()
        .max_by_key(|s| s.captured_at)
        .map(|s| ranked(&snapshot_keywords(grammar, s)))
        .unwrap_or_default()
}

pub async fn run_keywords(
    config: &Config,
    competitor: &str,
    url: &str,
    keyword: Option<&str>,
    json: bool,
) -> Result<()> {
    let grammar = config.grammar()?;
    let store = db::open_store(config).await?;
    let snapshots = store.snapshots(competitor, url).await?;
    store.close().await;

    if snapshots.is_empty() {
        bail!("No captures found for {} {}", competitor, url);
    }

    let output = match keyword {
        Some(keyword) => KeywordsOutput::History {
            keyword: keyword.trim().to_lowercase(),
            points: keyword_history(&grammar, &snapshots, keyword),
        },
        None => KeywordsOutput::Latest {
            captured_at: snapshots
                .iter()
                .map(|s| s.captured_at)
                .max()
                .map(|t| t.format(CHANGE_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            keywords: latest_keywords(&grammar, &snapshots),
        },
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match output {
        KeywordsOutput::History { keyword, points } => {
            println!("keyword \"{}\" on {} {}", keyword, competitor, url);
            for point in points {
                println!(
                    "  {}  {}",
                    point.captured_at.format(CHANGE_DATE_FORMAT),
                    point.count
                );
            }
        }
        KeywordsOutput::Latest {
            captured_at,
            keywords,
        } => {
            println!("keywords on {} {} at {}", competitor, url, captured_at);
            if keywords.is_empty() {
                println!("  (none)");
            }
            for entry in keywords {
                println!("  {:>6}  {}", entry.count, entry.keyword);
            }
        }
    }

    Ok(())
}

//! Keyword ledger: parsing and diffing keyword occurrence strings.
//!
//! Upstream scrapers store the keywords found on a page as one
//! comma-separated string:
//!
//! ```text
//! lms - 4 разів, E-Learning - 2 разів (title), lms - 1 разів
//! ```
//!
//! Each entry is `<keyword> - <count> <occurrence-word>`. The occurrence
//! word is a fixed literal that anchors the match; anything after it
//! (such as a parenthesised section note) is ignored. Keywords are trimmed
//! and lower-cased, and repeated keywords have their counts summed.
//!
//! Entries that do not match are dropped. Parsing never fails.
//!
//! # Example
//!
//! ```rust
//! use change_tracker_core::keywords::{diff, parse};
//!
//! let old = parse("cat - 2 разів, Cat - 3 разів");
//! assert_eq!(old.get("cat"), Some(&5));
//!
//! let new = parse("cat - 5 разів, dog - 1 разів");
//! assert_eq!(diff(&old, &new).len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Serialize;

use crate::models::{KeywordCount, KeywordDelta, Snapshot};

/// Occurrence word used by the upstream data producers.
pub const OCCURRENCE_WORD: &str = "разів";

/// Normalized keyword → summed occurrence count, ordered by keyword.
pub type KeywordMap = BTreeMap<String, u64>;

static DEFAULT_GRAMMAR: LazyLock<KeywordGrammar> = LazyLock::new(|| {
    KeywordGrammar::with_occurrence_word(OCCURRENCE_WORD).expect("default keyword grammar")
});

/// The entry pattern for one occurrence string format.
///
/// Only the occurrence word is swappable. The rest of the pattern is the
/// upstream format and changing it is a compatibility break.
#[derive(Debug, Clone)]
pub struct KeywordGrammar {
    delimiter: char,
    occurrence_word: String,
    entry: Regex,
}

impl KeywordGrammar {
    /// Build a grammar anchored on `word` instead of [`OCCURRENCE_WORD`].
    pub fn with_occurrence_word(word: &str) -> Result<Self> {
        let word = word.trim();
        if word.is_empty() {
            bail!("keyword occurrence word must not be empty");
        }
        let pattern = format!(
            r"^\s*(?P<keyword>.*?)\s*-\s*(?P<count>\d+)\s*{}",
            regex::escape(word)
        );
        Ok(Self {
            delimiter: ',',
            occurrence_word: word.to_string(),
            entry: Regex::new(&pattern)?,
        })
    }

    pub fn occurrence_word(&self) -> &str {
        &self.occurrence_word
    }

    /// Parse a raw occurrence string into a [`KeywordMap`].
    pub fn parse(&self, raw: &str) -> KeywordMap {
        let mut map = KeywordMap::new();
        if raw.trim().is_empty() {
            return map;
        }
        for entry in raw.split(self.delimiter) {
            match self.parse_entry(entry) {
                Some((keyword, count)) => {
                    let slot = map.entry(keyword).or_insert(0);
                    *slot = slot.saturating_add(count);
                }
                None => {
                    if !entry.trim().is_empty() {
                        tracing::debug!(entry = entry.trim(), "skipping malformed keyword entry");
                    }
                }
            }
        }
        map
    }

    fn parse_entry(&self, entry: &str) -> Option<(String, u64)> {
        let caps = self.entry.captures(entry.trim())?;
        let keyword = caps.name("keyword")?.as_str().trim().to_lowercase();
        if keyword.is_empty() {
            return None;
        }
        let count = caps.name("count")?.as_str().parse::<u64>().ok()?;
        Some((keyword, count))
    }

    /// Render a map back into the upstream string format.
    pub fn format(&self, map: &KeywordMap) -> String {
        map.iter()
            .map(|(k, v)| format!("{} - {} {}", k, v, self.occurrence_word))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for KeywordGrammar {
    fn default() -> Self {
        DEFAULT_GRAMMAR.clone()
    }
}

/// Parse with the default grammar. `None`-like inputs should be passed as `""`.
pub fn parse(raw: &str) -> KeywordMap {
    DEFAULT_GRAMMAR.parse(raw)
}

/// Parse with an explicit grammar.
pub fn parse_with(grammar: &KeywordGrammar, raw: &str) -> KeywordMap {
    grammar.parse(raw)
}

/// Keyword ledger of a snapshot. An absent occurrence string is an empty ledger.
pub fn snapshot_keywords(grammar: &KeywordGrammar, snap: &Snapshot) -> KeywordMap {
    parse_with(grammar, snap.keyword_occurrences.as_deref().unwrap_or(""))
}

/// Canonical occurrence total of a snapshot. Absent, empty, and unparseable
/// occurrence strings all total 0.
pub fn snapshot_total(grammar: &KeywordGrammar, snap: &Snapshot) -> u64 {
    total_count(&snapshot_keywords(grammar, snap))
}

/// Diff two keyword maps, ordered by keyword.
///
/// Every keyword in either map lands in exactly one delta, or in none when
/// its count is unchanged.
pub fn diff(old: &KeywordMap, new: &KeywordMap) -> Vec<KeywordDelta> {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    keys.into_iter()
        .filter_map(|keyword| match (old.get(keyword), new.get(keyword)) {
            (None, Some(&new_count)) => Some(KeywordDelta::Added {
                keyword: keyword.clone(),
                new_count,
            }),
            (Some(&old_count), None) => Some(KeywordDelta::Removed {
                keyword: keyword.clone(),
                old_count,
            }),
            (Some(&old_count), Some(&new_count)) if old_count != new_count => {
                Some(KeywordDelta::Changed {
                    keyword: keyword.clone(),
                    old_count,
                    new_count,
                })
            }
            _ => None,
        })
        .collect()
}

/// Canonical occurrence total: the sum of normalized per-keyword counts.
pub fn total_count(map: &KeywordMap) -> u64 {
    map.values().fold(0u64, |acc, v| acc.saturating_add(*v))
}

/// Entries ordered by count (desc), then keyword (asc).
pub fn ranked(map: &KeywordMap) -> Vec<KeywordCount> {
    let mut entries: Vec<KeywordCount> = map
        .iter()
        .map(|(keyword, count)| KeywordCount {
            keyword: keyword.clone(),
            count: *count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.keyword.cmp(&b.keyword)));
    entries
}

/// One point of a keyword's occurrence history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordPoint {
    pub captured_at: NaiveDateTime,
    pub count: u64,
}

/// Occurrences of `keyword` across snapshots, ordered by capture time.
///
/// Snapshots where the keyword is absent contribute a zero point so the
/// series has one entry per capture.
pub fn keyword_history(
    grammar: &KeywordGrammar,
    snapshots: &[Snapshot],
    keyword: &str,
) -> Vec<KeywordPoint> {
    let needle = keyword.trim().to_lowercase();
    let mut points: Vec<KeywordPoint> = snapshots
        .iter()
        .map(|snap| {
            let map = snapshot_keywords(grammar, snap);
            KeywordPoint {
                captured_at: snap.captured_at,
                count: map.get(&needle).copied().unwrap_or(0),
            }
        })
        .collect();
    points.sort_by_key(|p| p.captured_at);
    points
}

//! Composite diff report and change detection.
//!
//! [`build_report`] runs all three differs over a snapshot pair.
//! [`detect_changes`] turns the field changes between two consecutive
//! captures into [`ChangeRecord`]s, the rows activity calendars are built
//! from.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::content::{diff_lines, DiffStats};
use crate::fields::{diff_fields_with, SnapshotField};
use crate::keywords::{self, KeywordGrammar};
use crate::models::{ChangeRecord, ContentDiffLine, FieldChange, KeywordDelta, Snapshot};

/// Timestamp format used for `change_date` in change records.
pub const CHANGE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything that changed between two captures of one page.
#[derive(Debug, Clone, Serialize)]
pub struct DiffReport {
    pub competitor: String,
    pub url: String,
    pub old_captured_at: NaiveDateTime,
    pub new_captured_at: NaiveDateTime,
    pub fields: Vec<FieldChange>,
    pub keywords: Vec<KeywordDelta>,
    pub old_keyword_total: u64,
    pub new_keyword_total: u64,
    pub content: Vec<ContentDiffLine>,
    pub content_stats: DiffStats,
}

impl DiffReport {
    pub fn has_changes(&self) -> bool {
        !self.fields.is_empty() || !self.keywords.is_empty() || self.content_stats.has_changes()
    }
}

/// Diff `old` against `new` over `fields`, keyword counts, and body text.
pub fn build_report(
    grammar: &KeywordGrammar,
    old: &Snapshot,
    new: &Snapshot,
    fields: &[SnapshotField],
) -> DiffReport {
    let old_keywords = keywords::snapshot_keywords(grammar, old);
    let new_keywords = keywords::snapshot_keywords(grammar, new);
    let content = diff_lines(
        old.body_text.as_deref().unwrap_or(""),
        new.body_text.as_deref().unwrap_or(""),
    );
    let content_stats = DiffStats::from_lines(&content);

    DiffReport {
        competitor: new.competitor.clone(),
        url: new.url.clone(),
        old_captured_at: old.captured_at,
        new_captured_at: new.captured_at,
        fields: diff_fields_with(grammar, old, new, fields),
        keywords: keywords::diff(&old_keywords, &new_keywords),
        old_keyword_total: keywords::total_count(&old_keywords),
        new_keyword_total: keywords::total_count(&new_keywords),
        content,
        content_stats,
    }
}

/// Field changes from `previous` to `current`, as storable change records.
///
/// The body is only compared when the content hashes differ.
pub fn detect_changes(
    grammar: &KeywordGrammar,
    previous: &Snapshot,
    current: &Snapshot,
    fields: &[SnapshotField],
) -> Vec<ChangeRecord> {
    let same_body = previous.content_hash() == current.content_hash();
    let compared: Vec<SnapshotField> = fields
        .iter()
        .copied()
        .filter(|f| !(same_body && *f == SnapshotField::Content))
        .collect();

    let old_total = Some(keywords::snapshot_total(grammar, previous));
    let new_total = Some(keywords::snapshot_total(grammar, current));
    let change_date = current.captured_at.format(CHANGE_DATE_FORMAT).to_string();

    diff_fields_with(grammar, previous, current, &compared)
        .into_iter()
        .map(|change| ChangeRecord {
            competitor: current.competitor.clone(),
            url: current.url.clone(),
            field_changed: change.field_name,
            old_value: change.old_value,
            new_value: change.new_value,
            change_date: change_date.clone(),
            old_keywords_count: old_total,
            new_keywords_count: new_total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineStatus;
    use chrono::NaiveDate;

    fn snapshot(day: u32, title: &str, body: &str, keywords: &str) -> Snapshot {
        Snapshot {
            competitor: "ispringsolutions_com".into(),
            url: "https://www.ispringsolutions.com/".into(),
            captured_at: NaiveDate::from_ymd_opt(2024, 4, day)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
            title: Some(title.into()),
            heading_text: Some("Authoring tools".into()),
            description: None,
            body_text: Some(body.into()),
            keyword_occurrences: Some(keywords.into()),
        }
    }

    #[test]
    fn test_report_combines_all_differs() {
        let old = snapshot(1, "iSpring", "Intro\nPricing: $9\nFooter", "lms - 2 разів");
        let new = snapshot(
            2,
            "iSpring Suite",
            "Intro\nPricing: $12\nFooter",
            "lms - 3 разів, lxp - 1 разів",
        );
        let report = build_report(&KeywordGrammar::default(), &old, &new, &SnapshotField::METADATA);

        let changed: Vec<&str> = report.fields.iter().map(|f| f.field_name.as_str()).collect();
        assert_eq!(changed, vec!["title", "keywords_count"]);
        assert_eq!(report.keywords.len(), 2);
        assert_eq!((report.old_keyword_total, report.new_keyword_total), (2, 4));
        assert_eq!(report.content[1].status, LineStatus::Replaced);
        assert_eq!(report.content_stats.replaced, 1);
        assert!(report.has_changes());
    }

    #[test]
    fn test_keyword_case_edit_only_changes_raw_field() {
        let a = snapshot(1, "Same", "Body", "lms - 1 разів");
        let b = snapshot(2, "Same", "Body", "LMS - 1 разів");
        let report = build_report(&KeywordGrammar::default(), &a, &b, &SnapshotField::ALL);
        // keywords_found differs by case only; the parsed ledger does not
        assert_eq!(report.fields.len(), 1);
        assert!(report.keywords.is_empty());
        assert!(!report.content_stats.has_changes());
    }

    #[test]
    fn test_detect_changes_builds_records() {
        let a = snapshot(1, "Old", "Body", "lms - 1 разів");
        let b = snapshot(5, "New", "Body changed", "lms - 4 разів");
        let records = detect_changes(
            &KeywordGrammar::default(),
            &a,
            &b,
            &[SnapshotField::Title, SnapshotField::Content],
        );
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].field_changed, "title");
        assert_eq!(records[0].change_date, "2024-04-05 06:30:00");
        assert_eq!(records[0].old_keywords_count, Some(1));
        assert_eq!(records[0].new_keywords_count, Some(4));
        assert_eq!(records[1].field_changed, "content");
    }

    #[test]
    fn test_detect_changes_skips_body_with_same_hash() {
        let a = snapshot(1, "T", "Body", "");
        let b = snapshot(2, "T", "Body", "");
        let records = detect_changes(&KeywordGrammar::default(), &a, &b, &SnapshotField::ALL);
        assert!(records.is_empty());
    }

    #[test]
    fn test_absent_keywords_record_nothing_and_total_zero() {
        let mut a = snapshot(1, "T", "Body", "");
        a.keyword_occurrences = None;
        for raw in ["", "garbage"] {
            let b = snapshot(2, "T", "Body", raw);
            assert!(detect_changes(&KeywordGrammar::default(), &a, &b, &[SnapshotField::KeywordsCount])
                .is_empty());
        }

        let c = snapshot(3, "New", "Body", "");
        let records = detect_changes(&KeywordGrammar::default(), &a, &c, &SnapshotField::ALL);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].old_keywords_count, Some(0));
        assert_eq!(records[0].new_keywords_count, Some(0));
    }
}

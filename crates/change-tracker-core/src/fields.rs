//! Scalar field comparison between two snapshots.
//!
//! Comparison is strict string equality after trimming surrounding
//! whitespace. Absent values compare as the empty string but are reported
//! as `None` in the resulting [`FieldChange`].

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Error};

use crate::keywords::{snapshot_total, KeywordGrammar};
use crate::models::{FieldChange, Snapshot};

/// A comparable scalar field of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotField {
    Title,
    Heading,
    Description,
    Content,
    KeywordsFound,
    /// Canonical keyword occurrence total, see [`snapshot_total`].
    KeywordsCount,
}

impl SnapshotField {
    pub const ALL: [SnapshotField; 6] = [
        SnapshotField::Title,
        SnapshotField::Heading,
        SnapshotField::Description,
        SnapshotField::Content,
        SnapshotField::KeywordsFound,
        SnapshotField::KeywordsCount,
    ];

    /// Metadata fields compared by default (everything except the body).
    pub const METADATA: [SnapshotField; 4] = [
        SnapshotField::Title,
        SnapshotField::Heading,
        SnapshotField::Description,
        SnapshotField::KeywordsCount,
    ];

    /// Column name used in storage and change records.
    pub fn name(self) -> &'static str {
        match self {
            SnapshotField::Title => "title",
            SnapshotField::Heading => "h1",
            SnapshotField::Description => "description",
            SnapshotField::Content => "content",
            SnapshotField::KeywordsFound => "keywords_found",
            SnapshotField::KeywordsCount => "keywords_count",
        }
    }

    /// The field's raw value on `snap`.
    pub fn value(self, snap: &Snapshot, grammar: &KeywordGrammar) -> Option<String> {
        match self {
            SnapshotField::Title => snap.title.clone(),
            SnapshotField::Heading => snap.heading_text.clone(),
            SnapshotField::Description => snap.description.clone(),
            SnapshotField::Content => snap.body_text.clone(),
            SnapshotField::KeywordsFound => snap.keyword_occurrences.clone(),
            SnapshotField::KeywordsCount => Some(snapshot_total(grammar, snap).to_string()),
        }
    }
}

impl fmt::Display for SnapshotField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SnapshotField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(SnapshotField::Title),
            "h1" | "heading" | "heading_text" => Ok(SnapshotField::Heading),
            "description" => Ok(SnapshotField::Description),
            "content" | "body" | "body_text" => Ok(SnapshotField::Content),
            "keywords_found" | "keyword_occurrences" => Ok(SnapshotField::KeywordsFound),
            "keywords_count" | "keyword_total" => Ok(SnapshotField::KeywordsCount),
            other => Err(anyhow!("unknown snapshot field: '{}'", other)),
        }
    }
}

/// Compare `fields` between two snapshots using the default keyword grammar.
pub fn diff_fields(old: &Snapshot, new: &Snapshot, fields: &[SnapshotField]) -> Vec<FieldChange> {
    diff_fields_with(&KeywordGrammar::default(), old, new, fields)
}

/// Compare `fields` between two snapshots, in the order given.
pub fn diff_fields_with(
    grammar: &KeywordGrammar,
    old: &Snapshot,
    new: &Snapshot,
    fields: &[SnapshotField],
) -> Vec<FieldChange> {
    fields
        .iter()
        .filter_map(|field| {
            let old_value = field.value(old, grammar);
            let new_value = field.value(new, grammar);
            let a = old_value.as_deref().unwrap_or("").trim();
            let b = new_value.as_deref().unwrap_or("").trim();
            if a == b {
                return None;
            }
            Some(FieldChange {
                field_name: field.name().to_string(),
                old_value,
                new_value,
            })
        })
        .collect()
}

/// Like [`diff_fields`], but fields are given by name. Unknown names are skipped.
pub fn diff_named_fields(old: &Snapshot, new: &Snapshot, names: &[&str]) -> Vec<FieldChange> {
    let fields: Vec<SnapshotField> = names
        .iter()
        .filter_map(|name| match name.parse::<SnapshotField>() {
            Ok(field) => Some(field),
            Err(e) => {
                tracing::debug!("{}", e);
                None
            }
        })
        .collect();
    diff_fields(old, new, &fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn snapshot(title: Option<&str>) -> Snapshot {
        Snapshot {
            competitor: "talentlms_com".into(),
            url: "https://www.talentlms.com/".into(),
            captured_at: NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            title: title.map(str::to_string),
            heading_text: Some("Training made easy".into()),
            description: None,
            body_text: Some("body".into()),
            keyword_occurrences: Some("lms - 2 разів".into()),
        }
    }

    #[test]
    fn test_title_change() {
        let a = snapshot(Some("Welcome"));
        let b = snapshot(Some("Welcome Home"));
        let changes = diff_fields(&a, &b, &[SnapshotField::Title]);
        assert_eq!(
            changes,
            vec![FieldChange {
                field_name: "title".into(),
                old_value: Some("Welcome".into()),
                new_value: Some("Welcome Home".into()),
            }]
        );
    }

    #[test]
    fn test_whitespace_only_edit_is_ignored() {
        let a = snapshot(Some("Welcome"));
        let b = snapshot(Some("  Welcome \n"));
        assert!(diff_fields(&a, &b, &SnapshotField::ALL).is_empty());
    }

    fn blank(value: Option<&str>) -> Snapshot {
        let mut snap = snapshot(value);
        snap.heading_text = value.map(str::to_string);
        snap.description = value.map(str::to_string);
        snap.body_text = value.map(str::to_string);
        snap.keyword_occurrences = value.map(str::to_string);
        snap
    }

    #[test]
    fn test_absent_equals_empty_for_every_field() {
        let absent = blank(None);
        for value in ["", "   "] {
            let empty = blank(Some(value));
            assert!(
                diff_fields(&absent, &empty, &SnapshotField::ALL).is_empty(),
                "absent vs {:?}",
                value
            );
            assert!(diff_fields(&empty, &absent, &SnapshotField::ALL).is_empty());
        }
    }

    #[test]
    fn test_keyword_total_of_absent_empty_and_garbage_is_zero() {
        let absent = blank(None);
        for raw in ["", "garbage", "lms - x разів"] {
            let mut other = blank(None);
            other.keyword_occurrences = Some(raw.into());
            assert!(
                diff_fields(&absent, &other, &[SnapshotField::KeywordsCount]).is_empty(),
                "absent vs {:?}",
                raw
            );
        }
        assert_eq!(
            SnapshotField::KeywordsCount.value(&absent, &KeywordGrammar::default()),
            Some("0".to_string())
        );
    }

    #[test]
    fn test_absent_equals_empty_but_is_recorded_as_none() {
        let a = snapshot(None);
        let b = snapshot(Some("   "));
        assert!(diff_fields(&a, &b, &[SnapshotField::Title]).is_empty());

        let c = snapshot(Some("New title"));
        let changes = diff_fields(&a, &c, &[SnapshotField::Title]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old_value, None);
        assert_eq!(changes[0].new_value.as_deref(), Some("New title"));
    }

    #[test]
    fn test_keyword_total_uses_canonical_sum() {
        let a = snapshot(Some("t"));
        let mut b = snapshot(Some("t"));
        b.keyword_occurrences = Some("LMS - 1 разів, lms - 1 разів".into());
        assert!(diff_fields(&a, &b, &[SnapshotField::KeywordsCount]).is_empty());

        b.keyword_occurrences = Some("lms - 2 разів, lxp - 3 разів".into());
        let changes = diff_fields(&a, &b, &[SnapshotField::KeywordsCount]);
        assert_eq!(changes[0].old_value.as_deref(), Some("2"));
        assert_eq!(changes[0].new_value.as_deref(), Some("5"));
    }

    #[test]
    fn test_named_fields_skip_unknown() {
        let a = snapshot(Some("A"));
        let b = snapshot(Some("B"));
        let changes = diff_named_fields(&a, &b, &["nope", "Title", "h1"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].field_name, "title");
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in SnapshotField::ALL {
            assert_eq!(field.name().parse::<SnapshotField>().unwrap(), field);
        }
        assert!("keywords".parse::<SnapshotField>().is_err());
    }
}

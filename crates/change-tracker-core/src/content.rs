//! Line-level diff of page body text.
//!
//! Both texts are split into lines and aligned with a longest common
//! subsequence. Lines in the subsequence are `unchanged`; the rest are
//! `removed` (old only) or `added` (new only). Within each run of changes
//! between two unchanged lines, removals are listed before additions.
//!
//! [`diff_lines`] additionally folds a lone removed line followed by a lone
//! added line into one `replaced` row for side-by-side rendering. The
//! folding never changes which lines count as changed.
//!
//! # Algorithm
//!
//! 1. Split on line breaks (`\n`, `\r\n`, `\r`, and the Unicode line and
//!    paragraph separators). Empty text has no lines.
//! 2. Strip the common prefix and suffix (always unchanged).
//! 3. Intern the remaining lines and fill a suffix LCS table over them.
//! 4. Walk the table forward, buffering removals and additions until the
//!    next matching line, then flush removals before additions.
//!
//! The table is quadratic in the size of the differing middle section. Past
//! [`MAX_LCS_CELLS`] the middle section is reported as all removed followed
//! by all added.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::models::{ContentDiffLine, LineStatus};

/// Characters that end a line, besides `\r` and `\n`.
const LINE_BREAKS: [char; 8] = [
    '\u{0b}', '\u{0c}', '\u{1c}', '\u{1d}', '\u{1e}', '\u{85}', '\u{2028}', '\u{2029}',
];

/// Above this many table cells the differing middle section is reported as
/// removed then added instead of aligned.
pub const MAX_LCS_CELLS: usize = 25_000_000;

/// Split text on line breaks. `\r\n` is one break. A trailing line break
/// does not produce an empty final line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let end = match c {
            '\r' => match chars.peek() {
                Some((_, '\n')) => {
                    chars.next();
                    i + 2
                }
                _ => i + 1,
            },
            '\n' => i + 1,
            c if LINE_BREAKS.contains(&c) => i + c.len_utf8(),
            _ => continue,
        };
        lines.push(&text[start..i]);
        start = end;
    }
    if start < text.len() {
        lines.push(&text[start..]);
    }
    lines
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Align two line sequences, returning edit operations in order.
fn align<'a>(old: &[&'a str], new: &[&'a str]) -> Vec<Op> {
    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    let mut ids: HashMap<&str, u32> = HashMap::new();
    let mut a: Vec<u32> = Vec::with_capacity(old_mid.len());
    for &line in old_mid {
        let next = ids.len() as u32;
        a.push(*ids.entry(line).or_insert(next));
    }
    let mut b: Vec<u32> = Vec::with_capacity(new_mid.len());
    for &line in new_mid {
        let next = ids.len() as u32;
        b.push(*ids.entry(line).or_insert(next));
    }

    let (n, m) = (a.len(), b.len());
    let width = m + 1;
    let mut ops = Vec::with_capacity(old.len().max(new.len()));
    ops.extend((0..prefix).map(|k| Op::Equal(k, k)));

    if (n + 1).saturating_mul(width) > MAX_LCS_CELLS {
        debug!(old_lines = n, new_lines = m, "diff section too large to align");
        ops.extend((0..n).map(|i| Op::Delete(prefix + i)));
        ops.extend((0..m).map(|j| Op::Insert(prefix + j)));
        push_suffix(&mut ops, old.len(), new.len(), suffix);
        return ops;
    }

    // table[i * width + j] = LCS length of a[i..] and b[j..]
    let mut table = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i * width + j] = if a[i] == b[j] {
                table[(i + 1) * width + j + 1] + 1
            } else {
                table[(i + 1) * width + j].max(table[i * width + j + 1])
            };
        }
    }

    let mut deletes = Vec::new();
    let mut inserts = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            ops.append(&mut deletes);
            ops.append(&mut inserts);
            ops.push(Op::Equal(prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if j >= m || (i < n && table[(i + 1) * width + j] >= table[i * width + j + 1]) {
            deletes.push(Op::Delete(prefix + i));
            i += 1;
        } else {
            inserts.push(Op::Insert(prefix + j));
            j += 1;
        }
    }
    ops.append(&mut deletes);
    ops.append(&mut inserts);

    push_suffix(&mut ops, old.len(), new.len(), suffix);
    ops
}

fn push_suffix(ops: &mut Vec<Op>, old_len: usize, new_len: usize, suffix: usize) {
    let old_tail = old_len - suffix;
    let new_tail = new_len - suffix;
    ops.extend((0..suffix).map(|k| Op::Equal(old_tail + k, new_tail + k)));
}

/// Diff two texts line by line without folding replacements.
pub fn diff_lines_raw(old_text: &str, new_text: &str) -> Vec<ContentDiffLine> {
    let old = split_lines(old_text);
    let new = split_lines(new_text);
    align(&old, &new)
        .into_iter()
        .map(|op| match op {
            Op::Equal(i, j) => ContentDiffLine {
                status: LineStatus::Unchanged,
                old_line: Some(old[i].to_string()),
                new_line: Some(new[j].to_string()),
                old_line_number: Some(i + 1),
                new_line_number: Some(j + 1),
            },
            Op::Delete(i) => ContentDiffLine {
                status: LineStatus::Removed,
                old_line: Some(old[i].to_string()),
                new_line: None,
                old_line_number: Some(i + 1),
                new_line_number: None,
            },
            Op::Insert(j) => ContentDiffLine {
                status: LineStatus::Added,
                old_line: None,
                new_line: Some(new[j].to_string()),
                old_line_number: None,
                new_line_number: Some(j + 1),
            },
        })
        .collect()
}

/// Diff two texts line by line, folding single-line replacements.
pub fn diff_lines(old_text: &str, new_text: &str) -> Vec<ContentDiffLine> {
    collapse_replacements(diff_lines_raw(old_text, new_text))
}

/// Fold every exactly-one-removed, exactly-one-added run into a
/// [`LineStatus::Replaced`] row.
pub fn collapse_replacements(lines: Vec<ContentDiffLine>) -> Vec<ContentDiffLine> {
    fn status_at(lines: &[ContentDiffLine], idx: Option<usize>) -> Option<LineStatus> {
        idx.and_then(|i| lines.get(i)).map(|l| l.status)
    }

    let mut out = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let lone_pair = lines[i].status == LineStatus::Removed
            && status_at(&lines, Some(i + 1)) == Some(LineStatus::Added)
            && status_at(&lines, i.checked_sub(1)) != Some(LineStatus::Removed)
            && status_at(&lines, Some(i + 2)) != Some(LineStatus::Added);
        if lone_pair {
            let removed = &lines[i];
            let added = &lines[i + 1];
            out.push(ContentDiffLine {
                status: LineStatus::Replaced,
                old_line: removed.old_line.clone(),
                new_line: added.new_line.clone(),
                old_line_number: removed.old_line_number,
                new_line_number: added.new_line_number,
            });
            i += 2;
        } else {
            out.push(lines[i].clone());
            i += 1;
        }
    }
    out
}

/// Row counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    pub unchanged: usize,
    pub added: usize,
    pub removed: usize,
    pub replaced: usize,
}

impl DiffStats {
    pub fn from_lines(lines: &[ContentDiffLine]) -> Self {
        let mut stats = DiffStats::default();
        for line in lines {
            match line.status {
                LineStatus::Unchanged => stats.unchanged += 1,
                LineStatus::Added => stats.added += 1,
                LineStatus::Removed => stats.removed += 1,
                LineStatus::Replaced => stats.replaced += 1,
            }
        }
        stats
    }

    pub fn has_changes(&self) -> bool {
        self.added + self.removed + self.replaced > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statuses(lines: &[ContentDiffLine]) -> Vec<LineStatus> {
        lines.iter().map(|l| l.status).collect()
    }

    fn rebuild_new(lines: &[ContentDiffLine]) -> Vec<String> {
        lines
            .iter()
            .filter(|l| l.status != LineStatus::Removed)
            .map(|l| l.new_line.clone().unwrap())
            .collect()
    }

    fn rebuild_old(lines: &[ContentDiffLine]) -> Vec<String> {
        lines
            .iter()
            .filter(|l| l.status != LineStatus::Added)
            .map(|l| l.old_line.clone().unwrap())
            .collect()
    }

    #[test]
    fn test_split_lines() {
        assert!(split_lines("").is_empty());
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb\rc"), vec!["a", "b", "c"]);
        assert_eq!(split_lines("\n\nx"), vec!["", "", "x"]);
    }

    #[test]
    fn test_split_lines_on_unicode_breaks() {
        assert_eq!(split_lines("a\u{2028}b\u{2029}"), vec!["a", "b"]);
        assert_eq!(split_lines("a\x0cb\x0bc\u{85}d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\x1cb\x1dc\x1ed"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("привіт\u{2028}світ"), vec!["привіт", "світ"]);
    }

    #[test]
    fn test_unicode_separator_diffs_per_line() {
        let lines = diff_lines("a\u{2028}b", "a\u{2028}c");
        assert_eq!(
            statuses(&lines),
            vec![LineStatus::Unchanged, LineStatus::Replaced]
        );
        assert_eq!(lines[1].old_line.as_deref(), Some("b"));
        assert_eq!(lines[1].new_line.as_deref(), Some("c"));

        let lines = diff_lines("page 1\x0cpage 2", "page 1\x0cpage 2\x0cpage 3");
        assert_eq!(
            statuses(&lines),
            vec![LineStatus::Unchanged, LineStatus::Unchanged, LineStatus::Added]
        );
    }

    #[test]
    fn test_identical_texts_are_unchanged() {
        let text = "Intro\nFeatures\nPricing";
        let lines = diff_lines(text, text);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.status == LineStatus::Unchanged));
        assert_eq!(lines[2].old_line_number, Some(3));
        assert_eq!(lines[2].new_line_number, Some(3));
    }

    #[test]
    fn test_disjoint_texts_remove_then_add() {
        let lines = diff_lines_raw("a\nb\nc", "x\ny");
        assert_eq!(
            statuses(&lines),
            vec![
                LineStatus::Removed,
                LineStatus::Removed,
                LineStatus::Removed,
                LineStatus::Added,
                LineStatus::Added,
            ]
        );
        assert_eq!(diff_lines("a\nb\nc", "x\ny"), lines);
    }

    #[test]
    fn test_empty_sides() {
        assert!(diff_lines("", "").is_empty());

        let added = diff_lines("", "one\ntwo");
        assert_eq!(statuses(&added), vec![LineStatus::Added, LineStatus::Added]);
        assert_eq!(added[1].new_line_number, Some(2));

        let removed = diff_lines("one\ntwo", "");
        assert_eq!(
            statuses(&removed),
            vec![LineStatus::Removed, LineStatus::Removed]
        );
    }

    #[test]
    fn test_single_line_replacement_is_folded() {
        let lines = diff_lines("Title\nOld pricing\nFooter", "Title\nNew pricing\nFooter");
        assert_eq!(
            statuses(&lines),
            vec![
                LineStatus::Unchanged,
                LineStatus::Replaced,
                LineStatus::Unchanged
            ]
        );
        assert_eq!(lines[1].old_line.as_deref(), Some("Old pricing"));
        assert_eq!(lines[1].new_line.as_deref(), Some("New pricing"));
        assert_eq!(lines[1].old_line_number, Some(2));
        assert_eq!(lines[1].new_line_number, Some(2));
    }

    #[test]
    fn test_multi_line_runs_are_not_folded() {
        let lines = diff_lines("a\nb\nc\nz", "a\nx\nz");
        assert_eq!(
            statuses(&lines),
            vec![
                LineStatus::Unchanged,
                LineStatus::Removed,
                LineStatus::Removed,
                LineStatus::Added,
                LineStatus::Unchanged,
            ]
        );
    }

    #[test]
    fn test_insertion_in_the_middle() {
        let lines = diff_lines("a\nb\nc", "a\nb\nnew\nc");
        assert_eq!(
            statuses(&lines),
            vec![
                LineStatus::Unchanged,
                LineStatus::Unchanged,
                LineStatus::Added,
                LineStatus::Unchanged,
            ]
        );
        assert_eq!(lines[3].old_line_number, Some(3));
        assert_eq!(lines[3].new_line_number, Some(4));
    }

    #[test]
    fn test_lcs_keeps_longest_alignment() {
        let lines = diff_lines_raw("a\nb\nc\nd\ne", "b\nx\nd\ne\nf");
        let unchanged: Vec<&str> = lines
            .iter()
            .filter(|l| l.status == LineStatus::Unchanged)
            .map(|l| l.old_line.as_deref().unwrap())
            .collect();
        assert_eq!(unchanged, vec!["b", "d", "e"]);
    }

    #[test]
    fn test_round_trip_reconstructs_both_sides() {
        let cases = [
            ("", "x"),
            ("a\nb\nc", "c\nb\na"),
            ("one\ntwo\nthree\ntwo", "two\nthree\nfour\none"),
            ("Привіт\nсвіт\n\u{7}bell", "Привіт\nрідний світ\n\u{7}bell\n"),
            ("dup\ndup\ndup", "dup\nx\ndup"),
        ];
        for (old, new) in cases {
            for lines in [diff_lines(old, new), diff_lines_raw(old, new)] {
                assert_eq!(rebuild_new(&lines), split_lines(new), "new side of {:?}", (old, new));
                assert_eq!(rebuild_old(&lines), split_lines(old), "old side of {:?}", (old, new));
            }
        }
    }

    #[test]
    fn test_long_single_line() {
        let long = "x".repeat(200_000);
        let lines = diff_lines(&long, &format!("{}y", long));
        assert_eq!(statuses(&lines), vec![LineStatus::Replaced]);
    }

    #[test]
    fn test_oversized_section_is_removed_then_added() {
        // 6000 x 6000 distinct lines exceed the table budget.
        let old: Vec<String> = (0..6000).map(|i| format!("old {}", i)).collect();
        let new: Vec<String> = (0..6000).map(|i| format!("new {}", i)).collect();
        let old_text = format!("head\n{}\ntail", old.join("\n"));
        let new_text = format!("head\n{}\ntail", new.join("\n"));
        let lines = diff_lines(&old_text, &new_text);
        let stats = DiffStats::from_lines(&lines);
        assert_eq!(
            stats,
            DiffStats {
                unchanged: 2,
                added: 6000,
                removed: 6000,
                replaced: 0
            }
        );
        assert_eq!(lines[1].status, LineStatus::Removed);
        assert_eq!(lines[6001].status, LineStatus::Added);
        assert_eq!(lines.last().unwrap().old_line_number, Some(6002));
        assert_eq!(rebuild_old(&lines), split_lines(&old_text));
        assert_eq!(rebuild_new(&lines), split_lines(&new_text));
    }

    #[test]
    fn test_stats() {
        let lines = diff_lines("a\nb\nc\nd", "a\nB\nc\nd\ne");
        let stats = DiffStats::from_lines(&lines);
        assert_eq!(
            stats,
            DiffStats {
                unchanged: 3,
                added: 1,
                removed: 0,
                replaced: 1
            }
        );
        assert!(stats.has_changes());
        assert!(!DiffStats::from_lines(&diff_lines("a", "a")).has_changes());
    }
}

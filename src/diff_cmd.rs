//! `ctrack diff`: compare two captures of one page.

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};

use change_tracker_core::models::{KeywordDelta, LineStatus};
use change_tracker_core::report::{build_report, DiffReport, CHANGE_DATE_FORMAT};
use change_tracker_core::store::SnapshotStore;

use crate::config::Config;
use crate::db;

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// A `--from` / `--to` argument: an exact capture time or a whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSelector {
    At(NaiveDateTime),
    /// The last capture on this day.
    Day(NaiveDate),
}

impl CaptureSelector {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        for fmt in DATETIME_FORMATS {
            if let Ok(at) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Ok(Self::At(at));
            }
        }
        if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Ok(Self::Day(day));
        }
        bail!(
            "Invalid capture time '{}'. Use YYYY-MM-DD or YYYY-MM-DD HH:MM:SS.",
            raw
        )
    }

    fn resolve(self, times: &[NaiveDateTime]) -> Option<NaiveDateTime> {
        match self {
            Self::At(at) => times.iter().copied().find(|t| *t == at),
            Self::Day(day) => times.iter().copied().filter(|t| t.date() == day).max(),
        }
    }
}

/// Pick the (old, new) capture pair from a page's ascending capture times.
///
/// Without `to`, the newest capture is used. Without `from`, the capture
/// immediately before `to` is used.
pub fn select_pair(
    times: &[NaiveDateTime],
    from: Option<CaptureSelector>,
    to: Option<CaptureSelector>,
) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let new = match to {
        Some(sel) => sel
            .resolve(times)
            .with_context(|| format!("No capture matches --to {:?}", sel))?,
        None => *times.last().context("Page has no captures")?,
    };
    let old = match from {
        Some(sel) => sel
            .resolve(times)
            .with_context(|| format!("No capture matches --from {:?}", sel))?,
        None => times
            .iter()
            .copied()
            .filter(|t| *t < new)
            .max()
            .context("Page needs at least two captures to diff")?,
    };
    Ok((old, new))
}

fn truncate(line: &str, max_chars: usize) -> String {
    if max_chars == 0 || line.chars().count() <= max_chars {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn show(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("{:?}", v),
        None => "(none)".to_string(),
    }
}

fn line_no(n: Option<usize>) -> String {
    n.map(|n| n.to_string()).unwrap_or_default()
}

/// Render a report as plain text.
pub fn render_text(report: &DiffReport, max_line_chars: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("diff {} {}\n", report.competitor, report.url));
    out.push_str(&format!(
        "  from: {}\n",
        report.old_captured_at.format(CHANGE_DATE_FORMAT)
    ));
    out.push_str(&format!(
        "  to:   {}\n",
        report.new_captured_at.format(CHANGE_DATE_FORMAT)
    ));

    if !report.has_changes() {
        out.push_str("No changes found.\n");
        return out;
    }

    if !report.fields.is_empty() {
        out.push_str("\nFields:\n");
        for change in &report.fields {
            out.push_str(&format!(
                "  {}: {} -> {}\n",
                change.field_name,
                truncate(&show(change.old_value.as_deref()), max_line_chars),
                truncate(&show(change.new_value.as_deref()), max_line_chars),
            ));
        }
    }

    if !report.keywords.is_empty() {
        out.push_str(&format!(
            "\nKeywords (total {} -> {}):\n",
            report.old_keyword_total, report.new_keyword_total
        ));
        for delta in &report.keywords {
            let line = match delta {
                KeywordDelta::Added { keyword, new_count } => {
                    format!("  + {}: {}", keyword, new_count)
                }
                KeywordDelta::Removed { keyword, old_count } => {
                    format!("  - {}: {}", keyword, old_count)
                }
                KeywordDelta::Changed {
                    keyword,
                    old_count,
                    new_count,
                } => format!("  ~ {}: {} -> {}", keyword, old_count, new_count),
            };
            out.push_str(&line);
            out.push('\n');
        }
    }

    let stats = &report.content_stats;
    if stats.has_changes() {
        out.push_str(&format!(
            "\nContent (+{} -{} ~{} ={}):\n",
            stats.added, stats.removed, stats.replaced, stats.unchanged
        ));
        for line in &report.content {
            let old = truncate(line.old_line.as_deref().unwrap_or(""), max_line_chars);
            let new = truncate(line.new_line.as_deref().unwrap_or(""), max_line_chars);
            match line.status {
                LineStatus::Unchanged => {}
                LineStatus::Removed => {
                    out.push_str(&format!("  - {:>4} | {}\n", line_no(line.old_line_number), old));
                }
                LineStatus::Added => {
                    out.push_str(&format!("  + {:>4} | {}\n", line_no(line.new_line_number), new));
                }
                LineStatus::Replaced => {
                    out.push_str(&format!("  ~ {:>4} | {}\n", line_no(line.old_line_number), old));
                    out.push_str(&format!("    {:>4} | {}\n", line_no(line.new_line_number), new));
                }
            }
        }
    }

    out
}

pub async fn run_diff(
    config: &Config,
    competitor: &str,
    url: &str,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> Result<()> {
    let from = from.map(CaptureSelector::parse).transpose()?;
    let to = to.map(CaptureSelector::parse).transpose()?;
    let grammar = config.grammar()?;
    let fields = config.report_fields()?;

    let store = db::open_store(config).await?;
    let times = store.capture_times(competitor, url).await?;
    if times.is_empty() {
        bail!("No captures found for {} {}", competitor, url);
    }
    let (old_at, new_at) = select_pair(&times, from, to)?;

    let old = store
        .get_snapshot(competitor, url, old_at)
        .await?
        .context("Capture disappeared while diffing")?;
    let new = store
        .get_snapshot(competitor, url, new_at)
        .await?
        .context("Capture disappeared while diffing")?;
    store.close().await;

    let report = build_report(&grammar, &old, &new, &fields);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_text(&report, config.report.max_line_chars));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use change_tracker_core::fields::SnapshotField;
    use change_tracker_core::keywords::KeywordGrammar;
    use change_tracker_core::models::Snapshot;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn snap(day: u32, title: &str, body: &str, keywords: &str) -> Snapshot {
        Snapshot {
            competitor: "talentlms_com".into(),
            url: "/features".into(),
            captured_at: at(day, 8),
            title: Some(title.into()),
            heading_text: None,
            description: None,
            body_text: Some(body.into()),
            keyword_occurrences: Some(keywords.into()),
        }
    }

    #[test]
    fn test_selector_parsing() {
        assert_eq!(
            CaptureSelector::parse("2024-05-02 08:00:00").unwrap(),
            CaptureSelector::At(at(2, 8))
        );
        assert_eq!(
            CaptureSelector::parse("2024-05-02T08:00:00").unwrap(),
            CaptureSelector::At(at(2, 8))
        );
        assert_eq!(
            CaptureSelector::parse("2024-05-02").unwrap(),
            CaptureSelector::Day(NaiveDate::from_ymd_opt(2024, 5, 2).unwrap())
        );
        assert!(CaptureSelector::parse("yesterday").is_err());
    }

    #[test]
    fn test_select_pair_defaults_to_last_two() {
        let times = vec![at(1, 8), at(2, 8), at(3, 8)];
        assert_eq!(select_pair(&times, None, None).unwrap(), (at(2, 8), at(3, 8)));
    }

    #[test]
    fn test_select_pair_by_day_takes_last_capture() {
        let times = vec![at(1, 8), at(1, 20), at(3, 8)];
        let day = CaptureSelector::parse("2024-05-01").unwrap();
        assert_eq!(
            select_pair(&times, Some(day), None).unwrap(),
            (at(1, 20), at(3, 8))
        );
        let to = CaptureSelector::parse("2024-05-01").unwrap();
        assert_eq!(select_pair(&times, None, Some(to)).unwrap(), (at(1, 8), at(1, 20)));
    }

    #[test]
    fn test_select_pair_errors() {
        assert!(select_pair(&[at(1, 8)], None, None).is_err());
        let missing = CaptureSelector::parse("2024-06-01").unwrap();
        assert!(select_pair(&[at(1, 8), at(2, 8)], Some(missing), None).is_err());
    }

    #[test]
    fn test_render_sections() {
        let old = snap(1, "LMS", "intro\nprice 10\nfooter", "lms - 2 разів, quiz - 1 разів");
        let new = snap(2, "LMS Pro", "intro\nprice 12\nfooter", "lms - 4 разів");
        let report = build_report(
            &KeywordGrammar::default(),
            &old,
            &new,
            &SnapshotField::METADATA,
        );
        let text = render_text(&report, 0);
        assert!(text.contains("title: \"LMS\" -> \"LMS Pro\""));
        assert!(text.contains("keywords_count: \"3\" -> \"4\""));
        assert!(text.contains("Keywords (total 3 -> 4):"));
        assert!(text.contains("  ~ lms: 2 -> 4"));
        assert!(text.contains("  - quiz: 1"));
        assert!(text.contains("Content (+0 -0 ~1 =2):"));
        assert!(text.contains("  ~    2 | price 10"));
        assert!(text.contains("       2 | price 12"));
        assert!(!text.contains("No changes found."));
    }

    #[test]
    fn test_render_no_changes() {
        let a = snap(1, "Same", "body", "lms - 1 разів");
        let mut b = a.clone();
        b.captured_at = at(2, 8);
        let report = build_report(&KeywordGrammar::default(), &a, &b, &SnapshotField::METADATA);
        assert!(render_text(&report, 0).ends_with("No changes found.\n"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abcdef", 0), "abcdef");
        assert_eq!(truncate("abcdef", 6), "abcdef");
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("привіт", 2), "пр…");
    }
}

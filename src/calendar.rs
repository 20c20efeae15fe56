//! `ctrack calendar`: yearly activity heatmap of change events.

use anyhow::Result;
use chrono::{Datelike, Local};

use change_tracker_core::activity::{
    group_by_month, group_by_week, latest_year, summarize, CalendarSummary,
};
use change_tracker_core::models::CalendarDay;
use change_tracker_core::store::SnapshotStore;

use crate::config::Config;
use crate::db;

const GLYPHS: [char; 5] = ['·', '░', '▒', '▓', '█'];
const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

fn glyph(day: &CalendarDay) -> char {
    GLYPHS[usize::from(day.level.min(4))]
}

fn render_header(summary: &CalendarSummary, competitor: &str, page: Option<&str>) -> String {
    let mut out = format!(
        "calendar {} {} ({})\n",
        competitor,
        summary.year,
        page.unwrap_or("all pages")
    );
    out.push_str(&format!("  events: {}\n", summary.total_events));
    out.push_str(&format!("  active days: {}\n", summary.active_days));
    match summary.busiest_day {
        Some(day) => out.push_str(&format!(
            "  busiest day: {} ({})\n",
            day.date, day.event_count
        )),
        None => out.push_str("  busiest day: none\n"),
    }
    out
}

fn render_legend() -> String {
    format!(
        "  {} 0  {} 1  {} 2-3  {} 4-5  {} 6+\n",
        GLYPHS[0], GLYPHS[1], GLYPHS[2], GLYPHS[3], GLYPHS[4]
    )
}

/// One row per month, one glyph per day.
pub fn render_months(summary: &CalendarSummary, competitor: &str, page: Option<&str>) -> String {
    let mut out = render_header(summary, competitor, page);
    out.push('\n');
    for block in group_by_month(&summary.days) {
        let cells: String = block.days.iter().map(glyph).collect();
        let events: u64 = block.days.iter().map(|d| u64::from(d.event_count)).sum();
        out.push_str(&format!("  {} {:<31} {}\n", block.name, cells, events));
    }
    out.push('\n');
    out.push_str(&render_legend());
    out
}

/// One row per weekday, one column per Monday-first week.
pub fn render_weeks(summary: &CalendarSummary, competitor: &str, page: Option<&str>) -> String {
    let mut out = render_header(summary, competitor, page);
    out.push('\n');
    let weeks = group_by_week(&summary.days);
    for (slot, name) in WEEKDAYS.iter().enumerate() {
        let cells: String = weeks
            .iter()
            .map(|week| week[slot].as_ref().map_or(' ', glyph))
            .collect();
        out.push_str(&format!("  {} {}\n", name, cells.trim_end()));
    }
    out.push('\n');
    out.push_str(&render_legend());
    out
}

pub async fn run_calendar(
    config: &Config,
    competitor: &str,
    page: Option<&str>,
    year: Option<i32>,
    weeks: bool,
    json: bool,
) -> Result<()> {
    let store = db::open_store(config).await?;
    let events = store.change_events(competitor, page).await?;
    store.close().await;

    let year = year
        .or_else(|| latest_year(&events))
        .unwrap_or_else(|| Local::now().year());
    let summary = summarize(&events, year);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if weeks {
        print!("{}", render_weeks(&summary, competitor, page));
    } else {
        print!("{}", render_months(&summary, competitor, page));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> CalendarSummary {
        summarize(
            [
                "2024-01-01 10:00:00",
                "2024-01-01 11:00:00",
                "2024-01-03 09:00:00",
                "2023-12-31 09:00:00",
            ],
            2024,
        )
    }

    #[test]
    fn test_month_rows() {
        let text = render_months(&summary(), "docebo_com", None);
        assert!(text.starts_with("calendar docebo_com 2024 (all pages)\n"));
        assert!(text.contains("  events: 3\n"));
        assert!(text.contains("  active days: 2\n"));
        assert!(text.contains("  busiest day: 2024-01-01 (2)\n"));
        assert!(text.contains("  Jan ▒·░····"));
        // 29 February is present in a leap year
        let feb = text.lines().find(|l| l.starts_with("  Feb")).unwrap();
        assert_eq!(feb.chars().filter(|c| *c == '·').count(), 29);
    }

    #[test]
    fn test_week_rows() {
        let text = render_weeks(&summary(), "docebo_com", Some("/pricing"));
        assert!(text.starts_with("calendar docebo_com 2024 (/pricing)\n"));
        // 2024-01-01 is a Monday, 2024-01-03 a Wednesday
        assert!(text.contains("  Mon ▒"));
        assert!(text.contains("  Wed ░"));
        assert_eq!(text.lines().filter(|l| l.starts_with("  Sun")).count(), 1);
    }

    #[test]
    fn test_idle_year() {
        let idle = summarize(Vec::<String>::new(), 2023);
        let text = render_months(&idle, "x", None);
        assert!(text.contains("  busiest day: none\n"));
        assert_eq!(idle.days.len(), 365);
    }
}

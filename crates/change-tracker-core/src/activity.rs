//! Activity calendar: change events bucketed by day.
//!
//! Aggregation runs in two steps:
//!
//! 1. [`bucket_by_day`] parses each event timestamp, keeps the calendar
//!    date, optionally filters to one year, and counts events per date.
//!    The result is sparse: days without events are absent.
//! 2. [`build_calendar`] expands the counts into one [`CalendarDay`] for
//!    every date of a year, Jan 1 through Dec 31, in order.
//!
//! Each day's level follows a fixed threshold table shared with the
//! heatmap styling (`contribution-level-0` .. `contribution-level-4`):
//!
//! | events | level |
//! |--------|-------|
//! | 0      | 0     |
//! | 1      | 1     |
//! | 2–3    | 2     |
//! | 4–5    | 3     |
//! | ≥ 6    | 4     |
//!
//! Unparseable timestamps are skipped one at a time; they never abort an
//! aggregation.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::models::CalendarDay;

/// Sparse per-date event counts.
pub type DayCounts = BTreeMap<NaiveDate, u32>;

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Parse a stored change timestamp down to its calendar date.
///
/// Accepts RFC 3339, PostgreSQL-style `YYYY-MM-DD HH:MM:SS[.f][+HH[:MM]]`,
/// `T`-separated naive datetimes, and plain `YYYY-MM-DD`. Offsets are
/// honoured: the date is the one local to the timestamp.
pub fn parse_event_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Count events per calendar date, optionally restricted to `year_filter`.
pub fn bucket_by_day<I, T>(events: I, year_filter: Option<i32>) -> DayCounts
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let mut skipped = 0usize;
    let dates = events.into_iter().filter_map(|event| {
        let raw = event.as_ref();
        let date = parse_event_date(raw);
        if date.is_none() {
            skipped += 1;
            tracing::debug!(timestamp = raw, "skipping unparseable change timestamp");
        }
        date
    });
    let counts = bucket_dates(dates, year_filter);
    if skipped > 0 {
        tracing::debug!(skipped, "change events dropped during aggregation");
    }
    counts
}

/// Count already-parsed dates, optionally restricted to `year_filter`.
pub fn bucket_dates<I>(dates: I, year_filter: Option<i32>) -> DayCounts
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut counts = DayCounts::new();
    for date in dates {
        if year_filter.is_some_and(|year| date.year() != year) {
            continue;
        }
        let slot = counts.entry(date).or_insert(0);
        *slot = slot.saturating_add(1);
    }
    counts
}

/// Heatmap level for a day's event count.
pub fn activity_level(event_count: u32) -> u8 {
    match event_count {
        0 => 0,
        1 => 1,
        2..=3 => 2,
        4..=5 => 3,
        _ => 4,
    }
}

/// One [`CalendarDay`] per date of `year`, in ascending order.
///
/// Returns 366 days for leap years and 365 otherwise. Counts for dates
/// outside `year` are ignored. A year chrono cannot represent yields an
/// empty calendar.
pub fn build_calendar(counts: &DayCounts, year: i32) -> Vec<CalendarDay> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    first
        .iter_days()
        .take_while(|date| date.year() == year)
        .map(|date| {
            let event_count = counts.get(&date).copied().unwrap_or(0);
            CalendarDay {
                date,
                event_count,
                level: activity_level(event_count),
            }
        })
        .collect()
}

/// Latest year with a parseable event, used as the default calendar year.
pub fn latest_year<I, T>(events: I) -> Option<i32>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    events
        .into_iter()
        .filter_map(|e| parse_event_date(e.as_ref()))
        .map(|d| d.year())
        .max()
}

/// A dense calendar plus headline numbers.
#[derive(Debug, Clone, Serialize)]
pub struct CalendarSummary {
    pub year: i32,
    pub total_events: u64,
    pub active_days: usize,
    /// Day with the most events; the earliest wins ties. `None` when idle.
    pub busiest_day: Option<CalendarDay>,
    pub days: Vec<CalendarDay>,
}

impl CalendarSummary {
    pub fn from_days(year: i32, days: Vec<CalendarDay>) -> Self {
        let mut total_events = 0u64;
        let mut active_days = 0;
        let mut busiest_day: Option<CalendarDay> = None;
        for day in &days {
            if day.event_count == 0 {
                continue;
            }
            total_events += u64::from(day.event_count);
            active_days += 1;
            if busiest_day.map_or(true, |b| day.event_count > b.event_count) {
                busiest_day = Some(*day);
            }
        }
        Self {
            year,
            total_events,
            active_days,
            busiest_day,
            days,
        }
    }
}

/// Bucket `events` for `year` and build its summary in one step.
pub fn summarize<I, T>(events: I, year: i32) -> CalendarSummary
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let counts = bucket_by_day(events, Some(year));
    CalendarSummary::from_days(year, build_calendar(&counts, year))
}

/// Days of one month, for month-block layouts.
#[derive(Debug, Clone, Serialize)]
pub struct MonthBlock {
    pub month: u32,
    pub name: &'static str,
    pub days: Vec<CalendarDay>,
}

/// Split a dense calendar into consecutive month blocks.
pub fn group_by_month(days: &[CalendarDay]) -> Vec<MonthBlock> {
    let mut blocks: Vec<MonthBlock> = Vec::new();
    for day in days {
        let month = day.date.month();
        match blocks.last_mut() {
            Some(block) if block.month == month => block.days.push(*day),
            _ => blocks.push(MonthBlock {
                month,
                name: MONTH_NAMES[day.date.month0() as usize],
                days: vec![*day],
            }),
        }
    }
    blocks
}

/// A Monday-first week column. Slots outside the input are `None`.
pub type WeekColumn = [Option<CalendarDay>; 7];

/// Split a dense calendar into Monday-first week columns.
pub fn group_by_week(days: &[CalendarDay]) -> Vec<WeekColumn> {
    let mut weeks: Vec<WeekColumn> = Vec::new();
    for day in days {
        let slot = day.date.weekday().num_days_from_monday() as usize;
        if slot == 0 || weeks.is_empty() {
            weeks.push([None; 7]);
        }
        if let Some(week) = weeks.last_mut() {
            week[slot] = Some(*day);
        }
    }
    weeks
}

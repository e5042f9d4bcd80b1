//! Calendar assembly for display and reports.
//!
//! Ranges are Berlin-civil: a week runs Monday 00:00 to Monday 00:00, a
//! month from the 1st to the 1st. Assembly merges appointments of every
//! status with blockers into one chronological list; rendering is plain
//! text, one line per entry.

use chrono::{Datelike, NaiveDate};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::repository::{find_overlapping_blockers, list_appointments_in_range};
use crate::error::SchedulingError;
use crate::models::Commitment;
use crate::timezone;

const MONTH_NAMES: [&str; 12] = [
    "Januar",
    "Februar",
    "März",
    "April",
    "Mai",
    "Juni",
    "Juli",
    "August",
    "September",
    "Oktober",
    "November",
    "Dezember",
];

/// A titled `[from, to)` instant range for one report.
#[derive(Debug, Clone, Serialize)]
pub struct ReportRange {
    pub from: i64,
    pub to: i64,
    pub title: String,
}

impl ReportRange {
    /// The ISO week containing `date`, titled with the week number and
    /// its Monday.
    pub fn week(date: NaiveDate) -> ReportRange {
        let (from, to) = timezone::week_bounds(date);
        let monday = timezone::week_monday(date);
        ReportRange {
            from,
            to,
            title: format!("KW {} ({})", date.iso_week().week(), monday.format("%d.%m.%Y")),
        }
    }

    pub fn month(year: i32, month: u32) -> Result<ReportRange, SchedulingError> {
        let (from, to) = timezone::month_bounds(year, month).ok_or_else(|| {
            SchedulingError::validation("month", "is not a valid calendar month")
        })?;
        Ok(ReportRange {
            from,
            to,
            title: format!("{} {year}", MONTH_NAMES[(month - 1) as usize]),
        })
    }

    pub fn year(year: i32) -> Result<ReportRange, SchedulingError> {
        let (from, to) = timezone::year_bounds(year)
            .ok_or_else(|| SchedulingError::validation("year", "is out of range"))?;
        Ok(ReportRange { from, to, title: year.to_string() })
    }
}

/// Every appointment (any status) and blocker overlapping `[from, to)`,
/// merged and sorted chronologically.
pub fn range_entries(
    conn: &Connection,
    from: i64,
    to: i64,
) -> Result<Vec<Commitment>, SchedulingError> {
    let mut entries: Vec<Commitment> = list_appointments_in_range(conn, from, to)?
        .into_iter()
        .map(Commitment::Appointment)
        .collect();
    entries.extend(
        find_overlapping_blockers(conn, from, to)?
            .into_iter()
            .map(Commitment::Blocker),
    );
    entries.sort_by_key(|entry| (entry.start_time(), entry.end_time()));
    Ok(entries)
}

/// The calendar of one Berlin civil day, boundary-crossing entries
/// included.
pub fn day_entries(conn: &Connection, date: NaiveDate) -> Result<Vec<Commitment>, SchedulingError> {
    let (from, to) = timezone::day_bounds(date);
    range_entries(conn, from, to)
}

/// One plain-text line per entry, e.g.
/// `15.06.2026 09:00-09:30  Anna Schmidt (CONFIRMED)`.
pub fn render_line(entry: &Commitment) -> String {
    let span = format!(
        "{}-{}",
        timezone::format_instant(entry.start_time()),
        timezone::format_time(entry.end_time())
    );
    match entry {
        Commitment::Appointment(a) => {
            format!("{span}  {} ({})", a.patient_name, a.status.as_str())
        }
        Commitment::Blocker(b) => format!("{span}  {}", b.title),
    }
}

/// Assemble the full text report for a range: title, then one line per
/// entry.
pub fn render_report(conn: &Connection, range: &ReportRange) -> Result<String, SchedulingError> {
    let entries = range_entries(conn, range.from, range.to)?;
    let mut out = range.title.clone();
    out.push('\n');
    if entries.is_empty() {
        out.push_str("Keine Einträge\n");
    }
    for entry in &entries {
        out.push_str(&render_line(entry));
        out.push('\n');
    }
    Ok(out)
}

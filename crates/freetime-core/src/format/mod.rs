//! Report rendering.
//!
//! Two output formats are supported:
//! - **Table**: grid tables and a plain-text summary for terminals
//! - **JSON**: a [`JsonReport`] document for scripting
//!
//! # Example
//!
//! ```rust
//! use chrono::Duration;
//! use freetime_core::format::ReportFormatter;
//!
//! let formatter = ReportFormatter::new(Duration::minutes(45));
//! assert_eq!(formatter.slots_heading(), "Free Time Slots (>= 45 minutes):");
//! ```

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::event::{CalendarEvent, FreeBusyStatus, ResponseStatus};
use crate::slots::{AnalysisSummary, FreeSlot, FreeTimeReport, WorkWindow};
use crate::time::{AnalysisWeek, format_duration};

/// Message shown when the week has no blocking events.
pub const NO_EVENTS_MESSAGE: &str = "No calendar events found for the specified period.";

/// Message shown when no gap meets the minimum duration.
pub const NO_SLOTS_MESSAGE: &str = "No free time slots found.";

const TIME_FORMAT: &str = "%H:%M";

/// The output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Grid tables and a text summary.
    #[default]
    Table,
    /// Machine-readable JSON.
    Json,
}

/// JSON rendering of a full analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub week: AnalysisWeek,
    pub work_start: String,
    pub work_end: String,
    pub min_slot_minutes: i64,
    /// Present only when events were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<JsonEvent>>,
    pub slots: Vec<JsonSlot>,
    pub summary: JsonSummary,
}

/// JSON rendering of a busy event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonEvent {
    pub subject: String,
    pub date: NaiveDate,
    pub start: String,
    pub end: String,
    pub response_status: ResponseStatus,
    pub free_busy_status: FreeBusyStatus,
    pub is_organizer: bool,
}

/// JSON rendering of a free slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSlot {
    pub date: NaiveDate,
    pub start: String,
    pub end: String,
    pub duration: String,
    pub duration_minutes: i64,
    pub effective_minutes: i64,
}

/// JSON rendering of the summary figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSummary {
    pub total_free_minutes: i64,
    pub total_effective_free_minutes: i64,
    pub total_work_minutes: i64,
    pub free_percentage: Option<f64>,
    pub observed_days: usize,
}

/// Renders analysis results for a given minimum slot duration.
#[derive(Debug, Clone)]
pub struct ReportFormatter {
    min_duration: Duration,
}

impl ReportFormatter {
    /// Creates a formatter; the minimum duration appears in headings and in
    /// the effective free time line.
    pub fn new(min_duration: Duration) -> Self {
        Self { min_duration }
    }

    fn min_minutes(&self) -> i64 {
        self.min_duration.num_minutes()
    }

    /// The two lines printed before retrieval starts.
    pub fn format_header(&self, week: &AnalysisWeek, window: &WorkWindow) -> String {
        format!(
            "Analyzing calendar from {} to {}...\nWork hours: {} - {}",
            week.start,
            week.end,
            window.start.format(TIME_FORMAT),
            window.end.format(TIME_FORMAT),
        )
    }

    /// Grid table of events: Subject, Date, Start, End.
    pub fn format_events_table(&self, events: &[&CalendarEvent]) -> String {
        let rows: Vec<Vec<String>> = events
            .iter()
            .map(|e| {
                vec![
                    e.subject.clone(),
                    e.start.date().to_string(),
                    e.start.time().format(TIME_FORMAT).to_string(),
                    e.end.time().format(TIME_FORMAT).to_string(),
                ]
            })
            .collect();
        render_grid(&["Subject", "Date", "Start", "End"], &rows)
    }

    /// Heading of the free slot section.
    pub fn slots_heading(&self) -> String {
        format!("Free Time Slots (>= {} minutes):", self.min_minutes())
    }

    /// Grid table of free slots: Date, Start Time, End Time, Duration.
    pub fn format_slots_table(&self, slots: &[FreeSlot]) -> String {
        let rows: Vec<Vec<String>> = slots
            .iter()
            .map(|s| {
                vec![
                    s.date.to_string(),
                    s.start.format(TIME_FORMAT).to_string(),
                    s.end.format(TIME_FORMAT).to_string(),
                    format_duration(s.duration),
                ]
            })
            .collect();
        render_grid(&["Date", "Start Time", "End Time", "Duration"], &rows)
    }

    /// The summary block.
    pub fn format_summary(&self, summary: &AnalysisSummary) -> String {
        let percentage = summary
            .free_percentage
            .map_or_else(|| "n/a".to_string(), |p| format!("{p:.2}%"));

        format!(
            "Summary:\n\
             Total free time: {}\n\
             Effective free time (after subtracting {} min from each slot): {}\n\
             Total work time: {}\n\
             Free time percentage: {}",
            format_duration(summary.total_free),
            self.min_minutes(),
            format_duration(summary.total_effective_free),
            format_duration(summary.total_work),
            percentage,
        )
    }

    /// The slot section followed by the summary, or the no-slot message.
    pub fn format_report(&self, report: &FreeTimeReport) -> String {
        if report.is_empty() {
            return format!("{}\n{}", self.slots_heading(), NO_SLOTS_MESSAGE);
        }

        format!(
            "{}\n{}\n\n{}",
            self.slots_heading(),
            self.format_slots_table(&report.slots),
            self.format_summary(&report.summary),
        )
    }

    /// Builds the JSON document of an analysis.
    pub fn format_json(
        &self,
        week: &AnalysisWeek,
        window: &WorkWindow,
        events: Option<&[&CalendarEvent]>,
        report: &FreeTimeReport,
    ) -> JsonReport {
        JsonReport {
            week: *week,
            work_start: hhmm(window.start),
            work_end: hhmm(window.end),
            min_slot_minutes: self.min_minutes(),
            events: events.map(|events| events.iter().map(|e| to_json_event(e)).collect()),
            slots: report.slots.iter().map(to_json_slot).collect(),
            summary: JsonSummary {
                total_free_minutes: report.summary.total_free.num_minutes(),
                total_effective_free_minutes: report.summary.total_effective_free.num_minutes(),
                total_work_minutes: report.summary.total_work.num_minutes(),
                free_percentage: report
                    .summary
                    .free_percentage
                    .map(|p| (p * 100.0).round() / 100.0),
                observed_days: report.summary.observed_days,
            },
        }
    }
}

fn hhmm(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn to_json_event(event: &CalendarEvent) -> JsonEvent {
    JsonEvent {
        subject: event.subject.clone(),
        date: event.start.date(),
        start: hhmm(event.start.time()),
        end: hhmm(event.end.time()),
        response_status: event.response_status,
        free_busy_status: event.free_busy_status,
        is_organizer: event.is_organizer,
    }
}

fn to_json_slot(slot: &FreeSlot) -> JsonSlot {
    JsonSlot {
        date: slot.date,
        start: hhmm(slot.start),
        end: hhmm(slot.end),
        duration: format_duration(slot.duration),
        duration_minutes: slot.duration.num_minutes(),
        effective_minutes: slot.effective_duration.num_minutes(),
    }
}

/// Renders rows as a grid table with a double rule under the header.
///
/// Cells are left aligned and padded by one space on each side.
pub fn render_grid(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut lines = vec![
        grid_rule(&widths, '-'),
        grid_row(&widths, headers.iter().copied()),
        grid_rule(&widths, '='),
    ];
    for row in rows {
        lines.push(grid_row(&widths, row.iter().map(String::as_str)));
        lines.push(grid_rule(&widths, '-'));
    }
    if rows.is_empty() {
        lines.pop();
        lines.push(grid_rule(&widths, '-'));
    }

    lines.join("\n")
}

fn grid_rule(widths: &[usize], fill: char) -> String {
    let mut line = String::from("+");
    for width in widths {
        line.extend(std::iter::repeat_n(fill, width + 2));
        line.push('+');
    }
    line
}

fn grid_row<'a>(widths: &[usize], mut cells: impl Iterator<Item = &'a str>) -> String {
    let mut line = String::from("|");
    for width in widths {
        let cell = cells.next().unwrap_or("");
        let pad = width.saturating_sub(cell.chars().count());
        line.push(' ');
        line.push_str(cell);
        line.extend(std::iter::repeat_n(' ', pad + 1));
        line.push('|');
    }
    line
}

#[cfg(test)]
mod golden_tests;

//! Golden tests for report rendering.
//!
//! These use insta inline snapshots so the expected terminal output is
//! readable next to the test. Run `cargo insta review` after intentional
//! format changes.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::event::{CalendarEvent, ResponseStatus, busy_intervals, filter_busy};
use crate::format::ReportFormatter;
use crate::slots::{WorkWindow, analyze};
use crate::time::AnalysisWeek;

fn at(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, d)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

fn window() -> WorkWindow {
    WorkWindow::new(
        NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
    )
    .unwrap()
}

fn week() -> AnalysisWeek {
    AnalysisWeek::starting(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
}

/// Two busy days plus a declined invitation that must not show up.
fn sample_events() -> Vec<CalendarEvent> {
    vec![
        CalendarEvent::new("Standup", at(10, 9, 0), at(10, 9, 30))
            .with_response_status(ResponseStatus::Accepted),
        CalendarEvent::new("Lunch with team", at(10, 13, 0), at(10, 14, 0))
            .with_response_status(ResponseStatus::Organizer)
            .with_organizer(true),
        CalendarEvent::new("Workshop", at(11, 10, 0), at(11, 12, 0)),
        CalendarEvent::new("Vendor pitch", at(11, 15, 0), at(11, 16, 0))
            .with_response_status(ResponseStatus::Other),
    ]
}

fn formatter() -> ReportFormatter {
    ReportFormatter::new(Duration::minutes(45))
}

// =============================================================================
// Table output
// =============================================================================

#[test]
fn golden_header() {
    let output = formatter().format_header(&week(), &window());

    insta::assert_snapshot!(output, @r"
    Analyzing calendar from 2025-03-10 to 2025-03-14...
    Work hours: 09:00 - 18:00
    ");
}

#[test]
fn golden_events_table() {
    let events = sample_events();
    let busy = filter_busy(&events);

    let output = formatter().format_events_table(&busy);

    insta::assert_snapshot!(output, @r"
    +-----------------+------------+-------+-------+
    | Subject         | Date       | Start | End   |
    +=================+============+=======+=======+
    | Standup         | 2025-03-10 | 09:00 | 09:30 |
    +-----------------+------------+-------+-------+
    | Lunch with team | 2025-03-10 | 13:00 | 14:00 |
    +-----------------+------------+-------+-------+
    | Workshop        | 2025-03-11 | 10:00 | 12:00 |
    +-----------------+------------+-------+-------+
    ");
}

#[test]
fn golden_full_report() {
    let events = sample_events();
    let report = analyze(&busy_intervals(&events), window(), Duration::minutes(45)).unwrap();

    let output = formatter().format_report(&report);

    insta::assert_snapshot!(output, @r"
    Free Time Slots (>= 45 minutes):
    +------------+------------+----------+----------+
    | Date       | Start Time | End Time | Duration |
    +============+============+==========+==========+
    | 2025-03-10 | 09:30      | 13:00    | 3:30     |
    +------------+------------+----------+----------+
    | 2025-03-10 | 14:00      | 18:00    | 4:00     |
    +------------+------------+----------+----------+
    | 2025-03-11 | 09:00      | 10:00    | 1:00     |
    +------------+------------+----------+----------+
    | 2025-03-11 | 12:00      | 18:00    | 6:00     |
    +------------+------------+----------+----------+

    Summary:
    Total free time: 14:30
    Effective free time (after subtracting 45 min from each slot): 11:30
    Total work time: 18:00
    Free time percentage: 63.89%
    ");
}

#[test]
fn golden_no_slots() {
    let events = vec![CalendarEvent::new("All hands", at(10, 8, 0), at(10, 19, 0))];
    let report = analyze(&busy_intervals(&events), window(), Duration::minutes(45)).unwrap();

    let output = formatter().format_report(&report);

    insta::assert_snapshot!(output, @r"
    Free Time Slots (>= 45 minutes):
    No free time slots found.
    ");
}

// =============================================================================
// JSON output
// =============================================================================

#[test]
fn golden_json_single_day() {
    let events = sample_events();
    let monday: Vec<CalendarEvent> = events
        .into_iter()
        .filter(|e| e.date() == week().start)
        .collect();
    let report = analyze(&busy_intervals(&monday), window(), Duration::minutes(45)).unwrap();

    let output = formatter().format_json(&week(), &window(), None, &report);

    insta::assert_json_snapshot!(output, @r#"
    {
      "week": {
        "start": "2025-03-10",
        "end": "2025-03-14"
      },
      "work_start": "09:00",
      "work_end": "18:00",
      "min_slot_minutes": 45,
      "slots": [
        {
          "date": "2025-03-10",
          "start": "09:30",
          "end": "13:00",
          "duration": "3:30",
          "duration_minutes": 210,
          "effective_minutes": 165
        },
        {
          "date": "2025-03-10",
          "start": "14:00",
          "end": "18:00",
          "duration": "4:00",
          "duration_minutes": 240,
          "effective_minutes": 195
        }
      ],
      "summary": {
        "total_free_minutes": 450,
        "total_effective_free_minutes": 360,
        "total_work_minutes": 540,
        "free_percentage": 66.67,
        "observed_days": 1
      }
    }
    "#);
}

#[test]
fn golden_json_with_events() {
    let events = sample_events();
    let busy = filter_busy(&events);
    let report = analyze(&busy_intervals(&events), window(), Duration::minutes(45)).unwrap();

    let output = formatter().format_json(&week(), &window(), Some(busy.as_slice()), &report);

    insta::assert_json_snapshot!(output.events, @r#"
    [
      {
        "subject": "Standup",
        "date": "2025-03-10",
        "start": "09:00",
        "end": "09:30",
        "response_status": "accepted",
        "free_busy_status": "unknown",
        "is_organizer": false
      },
      {
        "subject": "Lunch with team",
        "date": "2025-03-10",
        "start": "13:00",
        "end": "14:00",
        "response_status": "organizer",
        "free_busy_status": "unknown",
        "is_organizer": true
      },
      {
        "subject": "Workshop",
        "date": "2025-03-11",
        "start": "10:00",
        "end": "12:00",
        "response_status": "unknown",
        "free_busy_status": "unknown",
        "is_organizer": false
      }
    ]
    "#);
}

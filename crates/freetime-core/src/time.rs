//! Time helpers for the analysis.
//!
//! This module provides [`AnalysisWeek`] for selecting the Monday to Friday
//! range to analyze, and the `H:MM` / `HH:MM` conversions used by the
//! configuration and the reports.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Number of work days in an analysis week.
pub const WORK_DAYS: u32 = 5;

/// A Monday to Friday range of dates, both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWeek {
    /// The Monday.
    pub start: NaiveDate,
    /// The Friday.
    pub end: NaiveDate,
}

impl AnalysisWeek {
    /// Returns the most recently completed work week before `today`,
    /// shifted back by `weeks_back` additional weeks.
    ///
    /// The current week never counts, even when `today` is a weekend day.
    /// Returns `None` when the week would fall before the earliest
    /// representable date.
    pub fn previous(today: NaiveDate, weeks_back: u32) -> Option<Self> {
        let days_since_monday = u64::from(today.weekday().num_days_from_monday());
        let days = days_since_monday + 7 * (1 + u64::from(weeks_back));
        today.checked_sub_days(Days::new(days)).map(Self::starting)
    }

    /// Returns the week starting on the given Monday.
    pub fn starting(monday: NaiveDate) -> Self {
        Self {
            start: monday,
            end: monday + Duration::days(i64::from(WORK_DAYS) - 1),
        }
    }
}

/// Converts an inclusive range of local dates into a half-open UTC range
/// `[first 00:00, day after last 00:00)` for the given timezone.
pub fn local_days_to_utc<Tz: TimeZone>(
    first: NaiveDate,
    last: NaiveDate,
    tz: &Tz,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_midnight_utc(first, tz);
    let end = local_midnight_utc(last + Duration::days(1), tz);
    (start, end)
}

fn local_midnight_utc<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = NaiveDateTime::new(date, NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Midnight skipped by a DST jump.
        .unwrap_or_else(|| midnight.and_utc())
}

/// Parses a time of day in `HH:MM` form.
///
/// # Errors
///
/// Returns [`AnalysisError::InvalidTimeFormat`] for anything else,
/// including out of range hours or minutes.
pub fn parse_time_of_day(input: &str) -> Result<NaiveTime, AnalysisError> {
    let trimmed = input.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .map_err(|_| AnalysisError::InvalidTimeFormat(input.to_string()))
}

/// Formats a duration as `H:MM`, hours not wrapping at 24.
///
/// Negative durations format as `0:00`.
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes().max(0);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    mod analysis_week {
        use super::*;

        #[test]
        fn from_midweek() {
            // Wednesday 2025-03-12
            let week = AnalysisWeek::previous(date(2025, 3, 12), 0).unwrap();
            assert_eq!(week.start, date(2025, 3, 3));
            assert_eq!(week.end, date(2025, 3, 7));
            assert_eq!(week.start.weekday(), Weekday::Mon);
            assert_eq!(week.end.weekday(), Weekday::Fri);
        }

        #[test]
        fn from_monday_skips_current_week() {
            let week = AnalysisWeek::previous(date(2025, 3, 10), 0).unwrap();
            assert_eq!(week.start, date(2025, 3, 3));
        }

        #[test]
        fn from_sunday_uses_week_before() {
            let week = AnalysisWeek::previous(date(2025, 3, 16), 0).unwrap();
            assert_eq!(week.start, date(2025, 3, 3));
            assert_eq!(week.end, date(2025, 3, 7));
        }

        #[test]
        fn weeks_back_shifts() {
            let week = AnalysisWeek::previous(date(2025, 3, 12), 2).unwrap();
            assert_eq!(week.start, date(2025, 2, 17));
            assert_eq!(week.end, date(2025, 2, 21));
        }

        #[test]
        fn across_year_boundary() {
            let week = AnalysisWeek::previous(date(2025, 1, 2), 0).unwrap();
            assert_eq!(week.start, date(2024, 12, 23));
            assert_eq!(week.end, date(2024, 12, 27));
        }

        #[test]
        fn too_far_back() {
            assert_eq!(AnalysisWeek::previous(date(2025, 3, 12), 20_000_000), None);
            assert_eq!(AnalysisWeek::previous(NaiveDate::MIN, 0), None);
        }
    }

    mod utc_range {
        use super::*;

        #[test]
        fn utc_is_identity() {
            let (start, end) = local_days_to_utc(date(2025, 3, 3), date(2025, 3, 7), &Utc);
            assert_eq!(start.to_rfc3339(), "2025-03-03T00:00:00+00:00");
            assert_eq!(end.to_rfc3339(), "2025-03-08T00:00:00+00:00");
        }

        #[test]
        fn fixed_offset_shifts() {
            let tz = FixedOffset::east_opt(2 * 3600).unwrap();
            let (start, end) = local_days_to_utc(date(2025, 3, 3), date(2025, 3, 7), &tz);
            assert_eq!(start.to_rfc3339(), "2025-03-02T22:00:00+00:00");
            assert_eq!(end.to_rfc3339(), "2025-03-07T22:00:00+00:00");
        }
    }

    mod parse_time {
        use super::*;

        #[test]
        fn valid() {
            assert_eq!(
                parse_time_of_day("09:00").unwrap(),
                NaiveTime::from_hms_opt(9, 0, 0).unwrap()
            );
            assert_eq!(
                parse_time_of_day(" 18:30 ").unwrap(),
                NaiveTime::from_hms_opt(18, 30, 0).unwrap()
            );
            assert_eq!(parse_time_of_day("00:00").unwrap(), NaiveTime::MIN);
        }

        #[test]
        fn invalid() {
            for input in ["24:00", "12:60", "noon", "", "12", "12:00:00"] {
                let err = parse_time_of_day(input).unwrap_err();
                assert!(
                    matches!(err, AnalysisError::InvalidTimeFormat(ref s) if s == input),
                    "{input:?} should be rejected"
                );
            }
        }
    }

    mod duration_format {
        use super::*;

        #[test]
        fn hours_and_minutes() {
            assert_eq!(format_duration(Duration::minutes(210)), "3:30");
            assert_eq!(format_duration(Duration::minutes(45)), "0:45");
            assert_eq!(format_duration(Duration::zero()), "0:00");
        }

        #[test]
        fn does_not_wrap_days() {
            assert_eq!(format_duration(Duration::hours(45)), "45:00");
        }

        #[test]
        fn ignores_seconds_and_negatives() {
            assert_eq!(format_duration(Duration::seconds(3599)), "0:59");
            assert_eq!(format_duration(Duration::minutes(-5)), "0:00");
        }
    }
}

//! Free slot derivation.
//!
//! Busy intervals are grouped by date, sorted, clipped to the daily
//! [`WorkWindow`] and swept with a cursor. Every gap between busy time that
//! is at least the minimum duration becomes a [`FreeSlot`].

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Duration, NaiveDate, NaiveTime, Timelike};

use crate::error::AnalysisError;
use crate::event::BusyInterval;

/// The daily working hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    /// Start of the working day.
    pub start: NaiveTime,
    /// End of the working day.
    pub end: NaiveTime,
}

impl WorkWindow {
    /// Creates a work window.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidWorkWindow`] unless `start < end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, AnalysisError> {
        let window = Self { start, end };
        window.check()?;
        Ok(window)
    }

    /// Length of the window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    fn check(&self) -> Result<(), AnalysisError> {
        if self.start >= self.end {
            return Err(AnalysisError::InvalidWorkWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// A free gap inside the work window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeSlot {
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// `end - start`.
    pub duration: Duration,
    /// The duration left after subtracting the minimum slot duration.
    pub effective_duration: Duration,
}

impl FreeSlot {
    fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime, min_duration: Duration) -> Self {
        let duration = end - start;
        Self {
            date,
            start,
            end,
            duration,
            effective_duration: duration - min_duration,
        }
    }
}

/// Aggregate figures over all free slots.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub total_free: Duration,
    pub total_effective_free: Duration,
    pub total_work: Duration,
    /// Effective free time as a percentage of work time, `None` when there
    /// is no work time to compare against.
    pub free_percentage: Option<f64>,
    /// Number of distinct dates that had busy time.
    pub observed_days: usize,
}

/// The result of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeTimeReport {
    pub slots: Vec<FreeSlot>,
    pub summary: AnalysisSummary,
}

impl FreeTimeReport {
    /// Returns true if no slot met the minimum duration.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Derives the free slots of every date that has busy intervals.
///
/// Dates without busy intervals produce nothing. The result is ordered by
/// date, then by start time.
///
/// # Errors
///
/// Fails on an empty or inverted work window, or a negative minimum
/// duration, before looking at any interval.
pub fn compute_free_slots(
    busy: &[BusyInterval],
    window: WorkWindow,
    min_duration: Duration,
) -> Result<Vec<FreeSlot>, AnalysisError> {
    window.check()?;
    if min_duration < Duration::zero() {
        return Err(AnalysisError::InvalidMinDuration);
    }

    let mut by_date: BTreeMap<NaiveDate, Vec<(NaiveTime, NaiveTime)>> = BTreeMap::new();
    for interval in busy {
        by_date
            .entry(interval.date)
            .or_default()
            .push((interval.start, interval.end));
    }

    let mut slots = Vec::new();
    for (date, mut intervals) in by_date {
        intervals.sort_by_key(|&(start, end)| (start, end));

        let mut cursor = window.start;
        for (start, end) in intervals {
            if end <= window.start || start >= window.end {
                continue;
            }
            let start = start.max(window.start);
            let end = end.min(window.end);

            if start > cursor && start - cursor >= min_duration {
                slots.push(FreeSlot::new(date, cursor, start, min_duration));
            }
            cursor = cursor.max(end);
        }

        if cursor < window.end && window.end - cursor >= min_duration {
            slots.push(FreeSlot::new(date, cursor, window.end, min_duration));
        }
    }

    Ok(slots)
}

/// Computes the summary figures for a set of slots.
///
/// Work time is the difference of the window's hour and minute components,
/// times `observed_days`; seconds in the window bounds are ignored.
pub fn summarize(slots: &[FreeSlot], window: WorkWindow, observed_days: usize) -> AnalysisSummary {
    let total_free = slots
        .iter()
        .fold(Duration::zero(), |acc, slot| acc + slot.duration);
    let total_effective_free = slots
        .iter()
        .fold(Duration::zero(), |acc, slot| acc + slot.effective_duration);

    let hours = i64::from(window.end.hour()) - i64::from(window.start.hour());
    let minutes = i64::from(window.end.minute()) - i64::from(window.start.minute());
    let days = i32::try_from(observed_days).unwrap_or(i32::MAX);
    let total_work = (Duration::hours(hours) + Duration::minutes(minutes)) * days;

    let free_percentage = (total_work > Duration::zero()).then(|| {
        total_effective_free.num_seconds() as f64 / total_work.num_seconds() as f64 * 100.0
    });

    AnalysisSummary {
        total_free,
        total_effective_free,
        total_work,
        free_percentage,
        observed_days,
    }
}

/// Runs the slot derivation and the summary in one go.
///
/// The number of observed days is the number of distinct dates in `busy`.
///
/// # Errors
///
/// Same as [`compute_free_slots`].
pub fn analyze(
    busy: &[BusyInterval],
    window: WorkWindow,
    min_duration: Duration,
) -> Result<FreeTimeReport, AnalysisError> {
    let slots = compute_free_slots(busy, window, min_duration)?;
    let observed_days = busy.iter().map(|b| b.date).collect::<BTreeSet<_>>().len();
    let summary = summarize(&slots, window, observed_days);

    tracing::debug!(
        busy = busy.len(),
        slots = slots.len(),
        observed_days,
        "computed free slots"
    );

    Ok(FreeTimeReport { slots, summary })
}

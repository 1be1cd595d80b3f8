//! Calendar event types and busy-time classification.
//!
//! This module provides the provider-agnostic event model consumed by the
//! free-slot engine:
//! - [`CalendarEvent`]: an event as retrieved from a calendar, in local time
//! - [`ResponseStatus`] / [`FreeBusyStatus`]: typed attendance information
//! - [`BusyInterval`]: a same-day time range that blocks scheduling
//!
//! [`CalendarEvent::should_block_time`] decides which events count as busy.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Subject used for events that come back without one.
pub const PLACEHOLDER_SUBJECT: &str = "No Subject";

/// The calling user's response to an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    /// The user organizes the event.
    Organizer,
    /// The user accepted the invitation.
    Accepted,
    /// Any other known answer: declined, tentative, not responded.
    Other,
    /// The provider returned no response information at all.
    #[default]
    Unknown,
}

/// How the event is shown on the user's free/busy schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreeBusyStatus {
    /// The event blocks time.
    Busy,
    /// The event is explicitly marked as not blocking.
    Free,
    /// No free/busy marking available.
    #[default]
    Unknown,
}

/// A calendar event retrieved for one analysis run.
///
/// Times are naive local date-times; a single local timezone is assumed
/// throughout the analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// The event subject, or [`PLACEHOLDER_SUBJECT`].
    pub subject: String,
    /// When the event starts (local time).
    pub start: NaiveDateTime,
    /// When the event ends (local time).
    pub end: NaiveDateTime,
    /// The calling user's response.
    pub response_status: ResponseStatus,
    /// The free/busy marking.
    pub free_busy_status: FreeBusyStatus,
    /// Whether the calling user organized the event.
    pub is_organizer: bool,
}

impl CalendarEvent {
    /// Creates an event with unknown response and free/busy information.
    ///
    /// An empty or blank subject is replaced by [`PLACEHOLDER_SUBJECT`].
    pub fn new(subject: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let subject = subject.into();
        let subject = if subject.trim().is_empty() {
            PLACEHOLDER_SUBJECT.to_string()
        } else {
            subject
        };

        Self {
            subject,
            start,
            end,
            response_status: ResponseStatus::Unknown,
            free_busy_status: FreeBusyStatus::Unknown,
            is_organizer: false,
        }
    }

    /// Builder method to set the response status.
    pub fn with_response_status(mut self, status: ResponseStatus) -> Self {
        self.response_status = status;
        self
    }

    /// Builder method to set the free/busy status.
    pub fn with_free_busy_status(mut self, status: FreeBusyStatus) -> Self {
        self.free_busy_status = status;
        self
    }

    /// Builder method to flag the event as organized by the user.
    pub fn with_organizer(mut self, is_organizer: bool) -> Self {
        self.is_organizer = is_organizer;
        self
    }

    /// Returns the calendar date the event starts on.
    pub fn date(&self) -> NaiveDate {
        self.start.date()
    }

    /// Returns true if this event is committed busy time.
    ///
    /// Organized or accepted events block time, other known answers do not.
    /// Without any response information the event is assumed busy. An event
    /// explicitly shown as free, or with no positive length, never blocks
    /// time.
    pub fn should_block_time(&self) -> bool {
        if self.free_busy_status == FreeBusyStatus::Free || self.end <= self.start {
            return false;
        }

        self.is_organizer
            || matches!(
                self.response_status,
                ResponseStatus::Organizer | ResponseStatus::Accepted | ResponseStatus::Unknown
            )
    }
}

/// Keeps only the events that block time, preserving order.
pub fn filter_busy(events: &[CalendarEvent]) -> Vec<&CalendarEvent> {
    events.iter().filter(|e| e.should_block_time()).collect()
}

/// Converts busy events into busy intervals.
///
/// Events that do not block time are skipped.
pub fn busy_intervals(events: &[CalendarEvent]) -> Vec<BusyInterval> {
    events
        .iter()
        .filter(|e| e.should_block_time())
        .filter_map(BusyInterval::from_event)
        .collect()
}

/// A time range on a single calendar date during which the user is busy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusyInterval {
    /// The calendar date.
    pub date: NaiveDate,
    /// Start of the busy range (inclusive).
    pub start: NaiveTime,
    /// End of the busy range (exclusive).
    pub end: NaiveTime,
}

impl BusyInterval {
    /// Creates a busy interval, or `None` unless `start < end`.
    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { date, start, end })
    }

    /// Derives the busy interval of an event.
    ///
    /// The interval belongs to the event's start date. An event running past
    /// midnight is truncated to the end of its start date.
    pub fn from_event(event: &CalendarEvent) -> Option<Self> {
        if event.end <= event.start {
            return None;
        }

        let date = event.start.date();
        let end = if event.end.date() > date {
            end_of_day()
        } else {
            event.end.time()
        };

        Self::new(date, event.start.time(), end)
    }
}

/// The last whole second of a day.
fn end_of_day() -> NaiveTime {
    // Wraps around to 23:59:59.
    NaiveTime::MIN - chrono::Duration::seconds(1)
}

//! CalendarProvider trait definition.
//!
//! A provider retrieves the events of a date range from one calendar
//! backend (Microsoft Graph, Exchange Web Services) and converts them into
//! [`CalendarEvent`]s in local time. Providers do not filter: deciding which
//! events block time is up to the caller.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use freetime_core::{AnalysisWeek, CalendarEvent, local_days_to_utc};

use crate::error::ProviderResult;

/// Default cap on the number of events fetched for one range.
pub const DEFAULT_MAX_RESULTS: usize = 1000;

/// Options for fetching events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// First local date to fetch (inclusive).
    pub first_day: NaiveDate,
    /// Last local date to fetch (inclusive).
    pub last_day: NaiveDate,
    /// Maximum number of events to return.
    pub max_results: usize,
}

impl FetchOptions {
    /// Creates fetch options for an inclusive range of local dates.
    pub fn new(first_day: NaiveDate, last_day: NaiveDate) -> Self {
        Self {
            first_day,
            last_day,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Creates fetch options covering an analysis week.
    pub fn for_week(week: &AnalysisWeek) -> Self {
        Self::new(week.start, week.end)
    }

    /// The range as UTC instants, `[first_day 00:00, last_day + 1 00:00)`
    /// in the local timezone.
    pub fn utc_range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        local_days_to_utc(self.first_day, self.last_day, &Local)
    }
}

/// A boxed future for async trait methods.
///
/// Boxing keeps [`CalendarProvider`] object safe so the client can pick the
/// backend at runtime.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core abstraction for calendar backends.
///
/// Authentication state is managed by the implementation.
pub trait CalendarProvider: Send + Sync {
    /// Returns the name of this provider (e.g., "graph", "ews").
    fn name(&self) -> &str;

    /// Checks if the provider holds credentials it can use.
    ///
    /// This does not contact the server.
    fn is_authenticated(&self) -> bool;

    /// Fetches the events of the requested range.
    ///
    /// Pagination is handled internally up to `max_results`.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures, etc.
    fn fetch_events(&self, options: FetchOptions)
    -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>>;
}

/// A provider serving a fixed list of events.
///
/// Like a server calendar view, it returns every event overlapping the
/// requested range, including ones that started the day before.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    events: Vec<CalendarEvent>,
}

impl MemoryProvider {
    /// Creates a provider serving the given events.
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }
}

impl CalendarProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn is_authenticated(&self) -> bool {
        true
    }

    fn fetch_events(
        &self,
        options: FetchOptions,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        let events = self
            .events
            .iter()
            .filter(|e| overlaps(e, &options))
            .take(options.max_results)
            .cloned()
            .collect();
        Box::pin(async move { Ok(events) })
    }
}

fn overlaps(event: &CalendarEvent, options: &FetchOptions) -> bool {
    let range_start = options.first_day.and_time(NaiveTime::MIN);
    let range_end = options
        .last_day
        .succ_opt()
        .map_or(NaiveDateTime::MAX, |day| day.and_time(NaiveTime::MIN));

    // A zero-length event at the range start still counts.
    event.start < range_end && (event.end > range_start || event.start >= range_start)
}

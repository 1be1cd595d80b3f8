//! Core types: calendar events, busy-time filtering, free slot derivation,
//! report formatting

pub mod error;
pub mod event;
pub mod format;
pub mod slots;
pub mod time;
pub mod tracing;

pub use error::AnalysisError;
pub use event::{
    BusyInterval, CalendarEvent, FreeBusyStatus, PLACEHOLDER_SUBJECT, ResponseStatus,
    busy_intervals, filter_busy,
};
pub use format::{
    JsonEvent, JsonReport, JsonSlot, JsonSummary, NO_EVENTS_MESSAGE, NO_SLOTS_MESSAGE,
    OutputFormat, ReportFormatter, render_grid,
};
pub use slots::{
    AnalysisSummary, FreeSlot, FreeTimeReport, WorkWindow, analyze, compute_free_slots, summarize,
};
pub use time::{AnalysisWeek, format_duration, local_days_to_utc, parse_time_of_day};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};

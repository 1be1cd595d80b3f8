//! Errors raised by the free-time analysis.

use chrono::NaiveTime;
use thiserror::Error;

/// Errors raised while preparing or running a free-time analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The work window does not start before it ends.
    #[error("work start time ({start}) must be before end time ({end})")]
    InvalidWorkWindow { start: NaiveTime, end: NaiveTime },

    /// The minimum slot duration is negative.
    #[error("minimum slot duration must not be negative")]
    InvalidMinDuration,

    /// A time of day that is not `HH:MM`.
    #[error("invalid time format '{0}', expected HH:MM")]
    InvalidTimeFormat(String),
}

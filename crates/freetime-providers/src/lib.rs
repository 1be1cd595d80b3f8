//! CalendarProvider trait and implementations.
//!
//! This crate provides the retrieval side of freetime:
//!
//! - [`CalendarProvider`] - The trait every calendar backend implements
//! - [`FetchOptions`] - The local date range to retrieve
//! - [`ProviderError`] - Error types for provider operations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐    ┌──────────────────┐
//! │ Microsoft Graph  │    │ Exchange (EWS)   │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          ▼                       ▼
//! ┌──────────────────┐    ┌──────────────────┐
//! │  GraphProvider   │    │   EwsProvider    │
//! └────────┬─────────┘    └────────┬─────────┘
//!          │                       │
//!          │   CalendarProvider    │
//!          └───────────┬───────────┘
//!                      │
//!                      ▼
//!              ┌───────────────┐
//!              │ CalendarEvent │  (local time)
//!              └───────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use freetime_providers::{CalendarProvider, FetchOptions};
//!
//! async fn busy_events(provider: &dyn CalendarProvider, week: &AnalysisWeek) {
//!     let events = provider.fetch_events(FetchOptions::for_week(week)).await?;
//!     let busy = freetime_core::filter_busy(&events);
//! }
//! ```

pub mod error;
#[cfg(feature = "ews")]
pub mod ews;
#[cfg(feature = "graph")]
pub mod graph;
#[cfg(any(feature = "graph", feature = "ews"))]
mod http;
mod private_file;
pub mod provider;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use provider::{
    BoxFuture, CalendarProvider, DEFAULT_MAX_RESULTS, FetchOptions, MemoryProvider,
};

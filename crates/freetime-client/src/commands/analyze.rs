//! Analysis command.

use std::io::{self, Write};

use chrono::{Duration, Local};
use freetime_core::{
    AnalysisWeek, NO_EVENTS_MESSAGE, OutputFormat, ReportFormatter, WorkWindow, analyze,
    busy_intervals, filter_busy,
};
use freetime_providers::{CalendarProvider, FetchOptions};
use tracing::debug;

use crate::cli::AnalyzeArgs;
use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};
use crate::paths::AppPaths;

/// What to analyze and how to print it.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub week: AnalysisWeek,
    pub window: WorkWindow,
    pub min_slot: Duration,
    /// List the blocking events before the slots.
    pub show_events: bool,
    pub format: OutputFormat,
}

/// Analyzes the last completed work week (or an earlier one).
pub async fn run(paths: &AppPaths, config: &AppConfig, args: &AnalyzeArgs) -> ClientResult<()> {
    config.validate()?;
    let week = AnalysisWeek::previous(Local::now().date_naive(), args.weeks_back)
        .ok_or_else(|| {
            ClientError::Config(format!(
                "--weeks-back {} goes past the earliest supported date",
                args.weeks_back
            ))
        })?;

    let provider = super::build_provider(paths, config)?;
    if !provider.is_authenticated() {
        return Err(ClientError::not_authenticated());
    }

    let options = AnalyzeOptions {
        week,
        window: config.work_window()?,
        min_slot: config.min_slot(),
        show_events: args.show_events,
        format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        },
    };

    analyze_week(provider.as_ref(), &options, &mut io::stdout()).await
}

/// Fetches the week from `provider`, finds the free slots and writes the
/// report to `out`.
///
/// In table mode a week without blocking events prints
/// [`NO_EVENTS_MESSAGE`] instead of a report. JSON mode always writes a
/// complete document.
pub async fn analyze_week(
    provider: &dyn CalendarProvider,
    options: &AnalyzeOptions,
    out: &mut impl Write,
) -> ClientResult<()> {
    let formatter = ReportFormatter::new(options.min_slot);

    if options.format == OutputFormat::Table {
        writeln!(
            out,
            "{}",
            formatter.format_header(&options.week, &options.window)
        )?;
        out.flush()?;
    }

    let events = provider
        .fetch_events(FetchOptions::for_week(&options.week))
        .await?;
    let busy = filter_busy(&events);
    debug!(
        "{} of {} events from {} block time",
        busy.len(),
        events.len(),
        provider.name()
    );

    let report = analyze(&busy_intervals(&events), options.window, options.min_slot)?;

    match options.format {
        OutputFormat::Json => {
            let shown = options.show_events.then_some(busy.as_slice());
            let document = formatter.format_json(&options.week, &options.window, shown, &report);
            serde_json::to_writer_pretty(&mut *out, &document).map_err(io::Error::from)?;
            writeln!(out)?;
        }
        OutputFormat::Table => {
            if busy.is_empty() {
                writeln!(out, "{}", NO_EVENTS_MESSAGE)?;
                return Ok(());
            }
            if options.show_events {
                writeln!(out)?;
                writeln!(out, "Busy events:")?;
                writeln!(out, "{}", formatter.format_events_table(&busy))?;
            }
            writeln!(out)?;
            writeln!(out, "{}", formatter.format_report(&report))?;
        }
    }

    Ok(())
}

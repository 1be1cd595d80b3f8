//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use freetime_core::TracingOutputFormat;

use crate::config::ConfigOverrides;

/// freetime - Find the free time in last week's calendar
#[derive(Debug, Parser)]
#[command(name = "freetime")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the configuration and stored credentials
    #[arg(long, env = "FREETIME_HOME", global = true)]
    pub home: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Single-line human readable records
    Compact,
    /// One JSON object per record
    Json,
}

impl From<LogFormat> for TracingOutputFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Compact => TracingOutputFormat::Compact,
            LogFormat::Json => TracingOutputFormat::Json,
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in to Microsoft 365 or Exchange
    Auth(AuthArgs),

    /// Find free time slots in a past work week
    Analyze(AnalyzeArgs),

    /// Show or update the configuration
    #[command(args_conflicts_with_subcommands = true)]
    Config(ConfigArgs),
}

/// Flags shared by every command that can pick the backend.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Microsoft Application (client) ID for OAuth
    #[arg(long)]
    pub client_id: Option<String>,

    /// Microsoft tenant ID for OAuth
    #[arg(long)]
    pub tenant_id: Option<String>,

    /// Exchange server address (for legacy auth)
    #[arg(long)]
    pub server: Option<String>,
}

/// Flags selecting the authentication mode.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthModeArgs {
    /// Use OAuth authentication with Microsoft Graph (the default)
    #[arg(long, conflicts_with = "no_oauth")]
    pub use_oauth: bool,

    /// Use legacy username and password authentication with Exchange
    #[arg(long)]
    pub no_oauth: bool,
}

impl AuthModeArgs {
    fn use_oauth(&self) -> Option<bool> {
        match (self.use_oauth, self.no_oauth) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Work schedule flags.
#[derive(Debug, Clone, Default, Args)]
pub struct ScheduleArgs {
    /// Work day start time (format: HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub start_time: Option<String>,

    /// Work day end time (format: HH:MM)
    #[arg(long, value_name = "HH:MM")]
    pub end_time: Option<String>,

    /// Shortest free slot to report, in minutes
    #[arg(long, value_name = "MINUTES")]
    pub min_slot: Option<u32>,
}

/// Arguments of `freetime auth`.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    #[command(flatten)]
    pub mode: AuthModeArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Exchange username (for legacy auth)
    #[arg(long)]
    pub username: Option<String>,

    /// Exchange password (for legacy auth, prompting is preferred)
    #[arg(long)]
    pub password: Option<String>,

    /// Sign in again even if valid tokens are stored
    #[arg(long, short)]
    pub force: bool,
}

impl AuthArgs {
    /// Values that apply to this run only.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            use_oauth: self.mode.use_oauth(),
            client_id: self.connection.client_id.clone(),
            tenant_id: self.connection.tenant_id.clone(),
            server: self.connection.server.clone(),
            ..Default::default()
        }
    }
}

/// Arguments of `freetime analyze`.
#[derive(Debug, Clone, Default, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub schedule: ScheduleArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Analyze the week N weeks before last week
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub weeks_back: u32,

    /// Also list the events that block time
    #[arg(long)]
    pub show_events: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl AnalyzeArgs {
    /// Values that apply to this run only.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            work_start: self.schedule.start_time.clone(),
            work_end: self.schedule.end_time.clone(),
            min_slot_minutes: self.schedule.min_slot,
            client_id: self.connection.client_id.clone(),
            tenant_id: self.connection.tenant_id.clone(),
            server: self.connection.server.clone(),
            ..Default::default()
        }
    }
}

/// Arguments of `freetime config`.
///
/// Flags update `config.toml`; the subcommands only read it.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,

    #[command(flatten)]
    pub schedule: ScheduleArgs,

    #[command(flatten)]
    pub mode: AuthModeArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl ConfigArgs {
    /// Values to write to `config.toml`.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            work_start: self.schedule.start_time.clone(),
            work_end: self.schedule.end_time.clone(),
            min_slot_minutes: self.schedule.min_slot,
            use_oauth: self.mode.use_oauth(),
            client_id: self.connection.client_id.clone(),
            tenant_id: self.connection.tenant_id.clone(),
            server: self.connection.server.clone(),
        }
    }
}

/// Read-only configuration actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ConfigAction {
    /// Print the current configuration
    Show,

    /// Print the configuration and credential file paths
    Path,
}

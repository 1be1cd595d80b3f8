//! Logging setup for the `freetime` binary.
//!
//! Logs go to stderr; stdout carries only the report, so `--json` output can
//! be piped. The default filter only covers the `freetime` crates, and
//! `RUST_LOG` replaces it entirely.
//!
//! ```ignore
//! use freetime_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::cli())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Why logging could not be set up.
#[derive(Debug, Error)]
pub enum TracingError {
    /// A subscriber is already installed.
    #[error("failed to install the tracing subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// The custom filter directive does not parse.
    #[error("invalid log filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// Logging options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level for the `freetime` crates when `RUST_LOG` is unset.
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Add file and line to each record.
    pub include_location: bool,
    /// Add the module path to each record.
    pub include_target: bool,
    pub include_timestamp: bool,
    /// Directive used instead of `RUST_LOG` and the default level.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::cli()
    }
}

impl TracingConfig {
    /// Warnings and errors only, terse records.
    #[must_use]
    pub fn cli() -> Self {
        Self {
            default_level: Level::WARN,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            include_timestamp: false,
            env_filter: None,
        }
    }

    /// Everything down to `debug`, with module and source location, for
    /// `--debug`.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            ..Self::cli()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// The directive applied when neither `RUST_LOG` nor a custom filter
    /// is set. The binary and its library crates all start with `freetime`.
    pub fn default_directive(&self) -> String {
        let level = self.default_level.as_str().to_ascii_lowercase();
        ["freetime", "freetime_core", "freetime_providers", "freetime_client"]
            .map(|target| format!("{}={}", target, level))
            .join(",")
    }

    fn build_filter(&self) -> Result<EnvFilter, TracingError> {
        if let Some(directive) = self.env_filter.as_deref() {
            return Ok(EnvFilter::try_new(directive)?);
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_directive())))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails when a subscriber is already installed or the custom filter is
/// invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.build_filter()?;

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);

    let layer = match (config.output_format, config.include_timestamp) {
        (TracingOutputFormat::Json, _) => base.json().boxed(),
        (TracingOutputFormat::Compact, true) => base.compact().boxed(),
        (TracingOutputFormat::Compact, false) => base.compact().without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        let config = TracingConfig::default();
        assert_eq!(config.default_level, Level::WARN);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert!(!config.include_location);
        assert!(!config.include_timestamp);
    }

    #[test]
    fn debug_adds_location() {
        let config = TracingConfig::cli_debug();
        assert_eq!(config.default_level, Level::DEBUG);
        assert!(config.include_location);
        assert!(config.include_target);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
    }

    #[test]
    fn directive_covers_all_crates() {
        assert_eq!(
            TracingConfig::cli().with_level(Level::INFO).default_directive(),
            "freetime=info,freetime_core=info,freetime_providers=info,freetime_client=info"
        );
    }

    #[test]
    fn custom_filter_is_validated() {
        let config = TracingConfig::cli().with_env_filter("freetime_providers=trace");
        assert!(config.build_filter().is_ok());

        let config = TracingConfig::cli().with_env_filter("freetime=loudest");
        assert!(matches!(config.build_filter(), Err(TracingError::EnvFilter(_))));
    }

    #[test]
    fn json_format() {
        let config = TracingConfig::cli_debug().with_format(TracingOutputFormat::Json);
        assert_eq!(config.output_format, TracingOutputFormat::Json);
        assert_eq!(config.default_level, Level::DEBUG);
    }
}

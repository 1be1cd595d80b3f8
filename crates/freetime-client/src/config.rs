//! Client configuration.
//!
//! All settings live in a single `config.toml` in the config directory:
//!
//! ```toml
//! work_start = "09:00"
//! work_end = "18:00"
//! min_slot_minutes = 45
//! use_oauth = true
//! client_id = ""
//! tenant_id = ""
//! server = ""
//! ```
//!
//! `client_id`, `tenant_id` and `server` support secret references
//! (`pass::…`, `env::…`), resolved when a command needs them.

use std::fs;
use std::path::Path;

use chrono::Duration;
use freetime_core::{WorkWindow, parse_time_of_day};
use serde::{Deserialize, Serialize};
use toml_edit::DocumentMut;
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};
use crate::paths::AppPaths;
use crate::secret;

/// Which backend retrieves the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Microsoft Graph with an OAuth sign-in.
    OAuth,
    /// Exchange Web Services with a username and password.
    Legacy,
}

/// Settings from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Start of the work day, `HH:MM`.
    pub work_start: String,

    /// End of the work day, `HH:MM`.
    pub work_end: String,

    /// Shortest gap reported as a free slot, in minutes.
    pub min_slot_minutes: u32,

    /// Use Microsoft Graph (true) or Exchange Web Services (false).
    pub use_oauth: bool,

    /// Application (client) ID of the Azure app registration.
    pub client_id: String,

    /// Directory (tenant) ID.
    pub tenant_id: String,

    /// Exchange server host or EWS URL.
    pub server: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_start: "09:00".to_string(),
            work_end: "18:00".to_string(),
            min_slot_minutes: 45,
            use_oauth: true,
            client_id: String::new(),
            tenant_id: String::new(),
            server: String::new(),
        }
    }
}

/// Values given on the command line for a single run or a `config` update.
///
/// Blank strings count as not given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub work_start: Option<String>,
    pub work_end: Option<String>,
    pub min_slot_minutes: Option<u32>,
    pub use_oauth: Option<bool>,
    pub client_id: Option<String>,
    pub tenant_id: Option<String>,
    pub server: Option<String>,
}

impl ConfigOverrides {
    /// Returns true if no value is set.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// The set values as `config.toml` entries.
    fn entries(&self) -> Vec<(&'static str, toml_edit::Item)> {
        let mut entries = Vec::new();
        let texts = [
            ("work_start", &self.work_start),
            ("work_end", &self.work_end),
            ("client_id", &self.client_id),
            ("tenant_id", &self.tenant_id),
            ("server", &self.server),
        ];
        for (key, value) in texts {
            if let Some(text) = non_blank(value) {
                entries.push((key, toml_edit::value(text)));
            }
        }
        if let Some(minutes) = self.min_slot_minutes {
            entries.push(("min_slot_minutes", toml_edit::value(i64::from(minutes))));
        }
        if let Some(use_oauth) = self.use_oauth {
            entries.push(("use_oauth", toml_edit::value(use_oauth)));
        }
        entries
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Loads `config.toml`, falling back to defaults when it does not exist.
    pub fn load(paths: &AppPaths) -> ClientResult<Self> {
        Self::load_from(&paths.config_file())
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> ClientResult<Self> {
        if !path.exists() {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Applies command-line values on top of the file values.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        let texts = [
            (&mut self.work_start, &overrides.work_start),
            (&mut self.work_end, &overrides.work_end),
            (&mut self.client_id, &overrides.client_id),
            (&mut self.tenant_id, &overrides.tenant_id),
            (&mut self.server, &overrides.server),
        ];
        for (field, value) in texts {
            if let Some(text) = non_blank(value) {
                *field = text.to_string();
            }
        }
        if let Some(minutes) = overrides.min_slot_minutes {
            self.min_slot_minutes = minutes;
        }
        if let Some(use_oauth) = overrides.use_oauth {
            self.use_oauth = use_oauth;
        }
    }

    /// Builder form of [`AppConfig::apply`].
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        self.apply(overrides);
        self
    }

    pub fn auth_mode(&self) -> AuthMode {
        if self.use_oauth {
            AuthMode::OAuth
        } else {
            AuthMode::Legacy
        }
    }

    /// The minimum slot duration.
    pub fn min_slot(&self) -> Duration {
        Duration::minutes(i64::from(self.min_slot_minutes))
    }

    /// Parses and checks the work window.
    pub fn work_window(&self) -> ClientResult<WorkWindow> {
        let start = parse_time_of_day(&self.work_start).map_err(|_| {
            ClientError::Config(format!(
                "invalid work start time '{}'. Use 'freetime config --start-time HH:MM' to set it.",
                self.work_start
            ))
        })?;
        let end = parse_time_of_day(&self.work_end).map_err(|_| {
            ClientError::Config(format!(
                "invalid work end time '{}'. Use 'freetime config --end-time HH:MM' to set it.",
                self.work_end
            ))
        })?;

        WorkWindow::new(start, end).map_err(|e| {
            ClientError::Config(format!(
                "{}. Use 'freetime config --start-time HH:MM --end-time HH:MM' to fix it.",
                e
            ))
        })
    }

    /// Checks the work window and the minimum slot duration.
    fn validate_schedule(&self) -> ClientResult<WorkWindow> {
        let window = self.work_window()?;
        if self.min_slot_minutes == 0 {
            return Err(ClientError::Config(
                "minimum slot duration must be at least 1 minute. \
                 Use 'freetime config --min-slot MINUTES' to set it."
                    .to_string(),
            ));
        }
        Ok(window)
    }

    /// Checks everything an analysis needs.
    pub fn validate(&self) -> ClientResult<()> {
        self.validate_schedule()?;
        self.validate_connection()
    }

    /// Checks the settings the selected authentication mode needs.
    pub fn validate_connection(&self) -> ClientResult<()> {
        match self.auth_mode() {
            AuthMode::OAuth => {
                if self.client_id.trim().is_empty() {
                    return Err(ClientError::Config(
                        "Microsoft Application (client) ID is not configured. \
                         Use 'freetime config --client-id CLIENT_ID' to set it."
                            .to_string(),
                    ));
                }
                if self.tenant_id.trim().is_empty() {
                    return Err(ClientError::Config(
                        "Microsoft Tenant ID is not configured. \
                         Use 'freetime config --tenant-id TENANT_ID' to set it."
                            .to_string(),
                    ));
                }
            }
            AuthMode::Legacy => {
                if self.server.trim().is_empty() {
                    return Err(ClientError::Config(
                        "Exchange server address is not configured. \
                         Use 'freetime config --server SERVER' to set it."
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The client ID with secret references expanded.
    pub fn resolved_client_id(&self) -> ClientResult<String> {
        resolve_field("client_id", &self.client_id)
    }

    /// The tenant ID with secret references expanded.
    pub fn resolved_tenant_id(&self) -> ClientResult<String> {
        resolve_field("tenant_id", &self.tenant_id)
    }

    /// The server with secret references expanded.
    pub fn resolved_server(&self) -> ClientResult<String> {
        resolve_field("server", &self.server)
    }

    /// Writes the given values to `config.toml` and returns the result.
    ///
    /// Only the given keys are touched; comments and other content are
    /// kept. Nothing is written when the updated work window or minimum
    /// slot duration is invalid.
    pub fn save_update(paths: &AppPaths, overrides: &ConfigOverrides) -> ClientResult<Self> {
        let path = paths.config_file();
        let updated = Self::load_from(&path)?.with_overrides(overrides);
        updated.validate_schedule()?;

        let content = if path.exists() {
            fs::read_to_string(&path)?
        } else {
            String::new()
        };
        let mut doc = content.parse::<DocumentMut>().map_err(|e| {
            ClientError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;

        for (key, item) in overrides.entries() {
            doc[key] = item;
        }

        paths.ensure_dirs()?;
        fs::write(&path, doc.to_string())?;
        info!("configuration saved to {}", path.display());

        Ok(updated)
    }
}

fn resolve_field(name: &str, value: &str) -> ClientResult<String> {
    secret::resolve(value.trim())
        .map(|v| v.trim().to_string())
        .map_err(|e| ClientError::Config(format!("failed to resolve {}: {}", name, e)))
}

//! CLI, configuration store, authentication and analysis commands
//!
//! This crate provides the `freetime` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod paths;
pub mod prompt;
pub mod secret;

pub use cli::Cli;
pub use config::{AppConfig, AuthMode, ConfigOverrides};
pub use error::{ClientError, ClientResult};
pub use paths::AppPaths;

//! Configuration commands.

use std::io::Write;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::AppConfig;
use crate::error::{ClientError, ClientResult};
use crate::paths::AppPaths;

/// Dispatches `freetime config`.
///
/// Without flags or an action the current configuration is shown.
pub fn run(paths: &AppPaths, args: &ConfigArgs) -> ClientResult<()> {
    let mut stdout = std::io::stdout();
    match args.action {
        Some(ConfigAction::Show) => show(paths, &mut stdout),
        Some(ConfigAction::Path) => path(paths, &mut stdout),
        None => {
            let overrides = args.overrides();
            if overrides.is_empty() {
                return show(paths, &mut stdout);
            }
            AppConfig::save_update(paths, &overrides)?;
            println!("Configuration updated successfully.");
            Ok(())
        }
    }
}

/// Prints the configuration, defaults included.
pub fn show(paths: &AppPaths, out: &mut impl Write) -> ClientResult<()> {
    let config = AppConfig::load(paths)?;
    let toml_str = toml::to_string_pretty(&config)
        .map_err(|e| ClientError::Config(format!("failed to serialize config: {}", e)))?;
    writeln!(out, "# config.toml ({})", paths.config_file().display())?;
    write!(out, "{}", toml_str)?;
    Ok(())
}

/// Prints the files the client reads and writes.
pub fn path(paths: &AppPaths, out: &mut impl Write) -> ClientResult<()> {
    writeln!(out, "config: {}", paths.config_file().display())?;
    writeln!(out, "graph token: {}", paths.graph_token_file().display())?;
    writeln!(
        out,
        "exchange credentials: {}",
        paths.ews_credentials_file().display()
    )?;
    Ok(())
}

//! Authentication command.

use tracing::{info, warn};

use crate::cli::AuthArgs;
use crate::config::{AppConfig, AuthMode};
use crate::error::ClientResult;
use crate::paths::AppPaths;

/// Signs in with the configured authentication mode.
///
/// `args` may switch the mode and connection settings for this run; nothing
/// is written to `config.toml`.
pub async fn run(paths: &AppPaths, config: &AppConfig, args: &AuthArgs) -> ClientResult<()> {
    config.validate_connection()?;

    match config.auth_mode() {
        AuthMode::OAuth => oauth(paths, config, args.force).await,
        AuthMode::Legacy => legacy(paths, config, args).await,
    }
}

/// Runs the Microsoft sign-in in the browser unless valid tokens are stored.
#[cfg(feature = "graph")]
async fn oauth(paths: &AppPaths, config: &AppConfig, force: bool) -> ClientResult<()> {
    use freetime_providers::CalendarProvider;

    let provider = super::graph_provider(paths, config)?;

    if !force && provider.is_authenticated() && !provider.needs_reauth() {
        println!("Already authenticated with valid OAuth token.");
        println!("Use --force to sign in again.");
        return Ok(());
    }

    if force {
        provider.sign_out()?;
    }

    paths.ensure_dirs()?;
    println!("Opening your default web browser for authentication...");
    println!("Please log in with your corporate account and grant the requested permissions.");

    provider.authenticate(true).await?;

    info!("Microsoft Graph sign-in successful");
    println!("Authentication successful. OAuth token saved.");
    Ok(())
}

#[cfg(not(feature = "graph"))]
async fn oauth(paths: &AppPaths, config: &AppConfig, _force: bool) -> ClientResult<()> {
    super::build_provider(paths, config).map(|_| ())
}

/// Checks an Exchange username and password, then stores them.
///
/// Missing values are prompted for; the password is read without echo.
#[cfg(feature = "ews")]
async fn legacy(paths: &AppPaths, config: &AppConfig, args: &AuthArgs) -> ClientResult<()> {
    use crate::error::ClientError;
    use crate::{prompt, secret};

    let provider = super::ews_provider(paths, config)?;

    let username = match args.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => username.to_string(),
        _ => prompt::prompt_line("Enter your Exchange username: ")?,
    };
    let password = match args.password.as_deref() {
        Some(password) if !password.is_empty() => {
            if !secret::is_reference(password) {
                warn!("a plain --password is visible in the process list, prefer the prompt or a pass:: or env:: reference");
            }
            secret::resolve(password)
                .map_err(|e| ClientError::Config(format!("failed to resolve password: {}", e)))?
        }
        _ => prompt::prompt_password("Enter your Exchange password: ")?,
    };
    if username.is_empty() || password.is_empty() {
        return Err(ClientError::Authentication(
            "username and password are required".to_string(),
        ));
    }

    paths.ensure_dirs()?;
    println!("Authenticating with Exchange server: {}...", provider.server());

    provider
        .authenticate(username, password)
        .await
        .map_err(legacy_error)?;

    info!("Exchange credentials verified");
    println!("Authentication successful. Token saved.");
    Ok(())
}

#[cfg(not(feature = "ews"))]
async fn legacy(paths: &AppPaths, config: &AppConfig, _args: &AuthArgs) -> ClientResult<()> {
    super::build_provider(paths, config).map(|_| ())
}

/// Maps a failed credential check to the message shown to the user.
#[cfg(feature = "ews")]
fn legacy_error(err: freetime_providers::ProviderError) -> crate::error::ClientError {
    use crate::error::ClientError;
    use freetime_providers::ProviderErrorCode;

    if err.is_credential_problem() {
        return ClientError::Authentication(
            "invalid credentials or server configuration".to_string(),
        );
    }
    match err.code() {
        ProviderErrorCode::RateLimited => ClientError::Authentication(match err.retry_after() {
            Some(delay) => format!(
                "rate limit exceeded, please try again in {} seconds",
                delay.as_secs()
            ),
            None => "rate limit exceeded, please try again later".to_string(),
        }),
        _ => ClientError::from(err),
    }
}

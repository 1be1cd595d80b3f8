//! Command implementations.

pub mod analyze;
pub mod auth;
pub mod config;

use freetime_providers::CalendarProvider;
#[cfg(feature = "ews")]
use freetime_providers::ews::{EwsConfig, EwsProvider};
#[cfg(feature = "graph")]
use freetime_providers::graph::{GraphConfig, GraphProvider};

use crate::config::{AppConfig, AuthMode};
use crate::error::ClientResult;
#[cfg(not(all(feature = "graph", feature = "ews")))]
use crate::error::ClientError;
use crate::paths::AppPaths;

/// Creates the provider for the configured authentication mode.
pub fn build_provider(
    paths: &AppPaths,
    config: &AppConfig,
) -> ClientResult<Box<dyn CalendarProvider>> {
    match config.auth_mode() {
        AuthMode::OAuth => boxed_graph(paths, config),
        AuthMode::Legacy => boxed_ews(paths, config),
    }
}

/// Creates the Microsoft Graph provider.
#[cfg(feature = "graph")]
pub fn graph_provider(paths: &AppPaths, config: &AppConfig) -> ClientResult<GraphProvider> {
    let graph_config = GraphConfig::new(
        config.resolved_client_id()?,
        config.resolved_tenant_id()?,
        paths.graph_token_file(),
    );
    Ok(GraphProvider::new(graph_config)?)
}

/// Creates the Exchange Web Services provider.
#[cfg(feature = "ews")]
pub fn ews_provider(paths: &AppPaths, config: &AppConfig) -> ClientResult<EwsProvider> {
    let ews_config = EwsConfig::new(config.resolved_server()?, paths.ews_credentials_file());
    Ok(EwsProvider::new(ews_config)?)
}

#[cfg(feature = "graph")]
fn boxed_graph(paths: &AppPaths, config: &AppConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Ok(Box::new(graph_provider(paths, config)?))
}

#[cfg(not(feature = "graph"))]
fn boxed_graph(_paths: &AppPaths, _config: &AppConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::Config(
        "this build has no Microsoft Graph support, use 'freetime config --no-oauth'".to_string(),
    ))
}

#[cfg(feature = "ews")]
fn boxed_ews(paths: &AppPaths, config: &AppConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Ok(Box::new(ews_provider(paths, config)?))
}

#[cfg(not(feature = "ews"))]
fn boxed_ews(_paths: &AppPaths, _config: &AppConfig) -> ClientResult<Box<dyn CalendarProvider>> {
    Err(ClientError::Config(
        "this build has no Exchange Web Services support, use 'freetime config --use-oauth'"
            .to_string(),
    ))
}

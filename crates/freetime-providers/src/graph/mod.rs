//! Microsoft Graph calendar provider.
//!
//! This module provides a [`GraphProvider`] that reads the signed-in user's
//! calendar through the Microsoft Graph API. It is the default backend.
//!
//! # Authentication Flow
//!
//! 1. The user registers a public client application in Azure and provides
//!    its client ID and the tenant ID
//! 2. Provider starts a local HTTP server on a port from the configured range
//! 3. Opens the browser on the Microsoft sign-in page with a PKCE challenge
//! 4. Microsoft redirects to the loopback server with the authorization code
//! 5. Provider exchanges the code for access and refresh tokens
//! 6. Tokens are persisted and refreshed automatically afterwards
//!
//! # Example
//!
//! ```ignore
//! use freetime_providers::graph::{GraphConfig, GraphProvider};
//!
//! let config = GraphConfig::new(client_id, tenant_id, paths.graph_token_file());
//! let provider = GraphProvider::new(config)?;
//! provider.authenticate(false).await?;
//!
//! let events = provider.fetch_events(FetchOptions::for_week(&week)).await?;
//! ```

mod client;
mod config;
mod oauth;
mod provider;
mod tokens;

pub use client::GraphClient;
pub use config::GraphConfig;
pub use oauth::{OAuthClient, PkceFlow};
pub use provider::GraphProvider;
pub use tokens::{TokenInfo, TokenStorage};

//! Exchange Web Services provider.
//!
//! Legacy backend for on-premises Exchange servers that do not offer
//! Microsoft Graph. Requests are SOAP messages authenticated with HTTP
//! Basic; the username and password are stored locally after a successful
//! check against the server.
//!
//! # Example
//!
//! ```ignore
//! use freetime_providers::ews::{EwsConfig, EwsProvider};
//!
//! let provider = EwsProvider::new(EwsConfig::new("mail.example.com", path))?;
//! provider.authenticate("jdoe@example.com", password).await?;
//!
//! let events = provider.fetch_events(FetchOptions::for_week(&week)).await?;
//! ```

mod client;
mod config;
mod credentials;
mod provider;
mod xml;

pub use client::EwsClient;
pub use config::EwsConfig;
pub use credentials::StoredCredentials;
pub use provider::EwsProvider;

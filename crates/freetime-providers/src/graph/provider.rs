//! Microsoft Graph provider implementation.
//!
//! This module implements the [`CalendarProvider`] trait on top of the
//! Graph calendarView API.

use chrono::Local;
use freetime_core::CalendarEvent;
use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, FetchOptions};

use super::client::GraphClient;
use super::config::GraphConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

const PROVIDER_NAME: &str = "graph";

/// Microsoft Graph calendar provider.
///
/// Tokens are loaded from disk on creation. Expired access tokens are
/// refreshed transparently; the interactive flow only runs through
/// [`GraphProvider::authenticate`].
pub struct GraphProvider {
    config: GraphConfig,
    token_storage: TokenStorage,
    oauth_client: OAuthClient,
    api_client: TokioRwLock<Option<GraphClient>>,
}

impl GraphProvider {
    /// Creates a new Graph provider with the given configuration.
    ///
    /// This loads any existing tokens but does not start authentication.
    pub fn new(config: GraphConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;

        let token_storage = TokenStorage::new(&config.token_path);
        if let Err(e) = token_storage.load() {
            debug!("ignoring stored tokens: {}", e);
        }

        let oauth_client = OAuthClient::new(&config)?;

        Ok(Self {
            config,
            token_storage,
            oauth_client,
            api_client: TokioRwLock::new(None),
        })
    }

    /// Runs the browser sign-in unless usable tokens are already stored.
    ///
    /// Returns true when a new sign-in happened. With `force` the flow
    /// always runs.
    pub async fn authenticate(&self, force: bool) -> ProviderResult<bool> {
        if !force && self.is_authenticated() && !self.needs_reauth() {
            debug!("stored tokens are usable, skipping sign-in");
            return Ok(false);
        }

        info!("starting Microsoft sign-in");
        let tokens = self
            .oauth_client
            .authorize(&self.config.scopes, self.config.loopback_port_range)
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        let client = self.new_client(&tokens.access_token)?;
        self.token_storage.set(tokens)?;
        *self.api_client.write().await = Some(client);

        info!("sign-in complete, tokens saved to {:?}", self.token_storage.path());
        Ok(true)
    }

    /// Checks if the stored tokens lack a required scope.
    pub fn needs_reauth(&self) -> bool {
        self.token_storage.needs_reauth(&self.config.scopes)
    }

    /// Removes the stored tokens.
    pub fn sign_out(&self) -> ProviderResult<()> {
        self.token_storage.clear()
    }

    fn new_client(&self, access_token: &str) -> ProviderResult<GraphClient> {
        GraphClient::new(
            &self.config.api_base,
            access_token,
            self.config.timeout,
            &self.config.user_agent,
        )
    }

    /// Ensures an API client with a fresh access token exists.
    async fn ensure_client(&self) -> ProviderResult<()> {
        let tokens = self.token_storage.get().ok_or_else(|| {
            ProviderError::authentication("not signed in, run 'freetime auth'")
        })?;

        if !tokens.is_expired() {
            let mut client = self.api_client.write().await;
            if client.is_none() {
                *client = Some(self.new_client(&tokens.access_token)?);
            }
            return Ok(());
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication(
                "access token expired and no refresh token is stored, run 'freetime auth'",
            )
        })?;

        debug!("refreshing expired access token");
        let (access_token, rotated, expires_in) = self
            .oauth_client
            .refresh_token(refresh_token, &self.config.scopes)
            .await?;

        let client = self.new_client(&access_token)?;
        self.token_storage
            .apply_refresh(access_token, rotated, expires_in)?;
        *self.api_client.write().await = Some(client);
        Ok(())
    }

    async fn fetch_impl(&self, options: &FetchOptions) -> ProviderResult<Vec<CalendarEvent>> {
        self.ensure_client().await?;

        let (start, end) = options.utc_range();
        debug!(
            "fetching calendarView from {} to {} ({})",
            start,
            end,
            Local::now().offset()
        );

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;
        client.calendar_view(start, end, options.max_results).await
    }

}

impl CalendarProvider for GraphProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_authenticated(&self) -> bool {
        self.token_storage.has_valid_tokens() || self.token_storage.has_refresh_token()
    }

    fn fetch_events(
        &self,
        options: FetchOptions,
    ) -> BoxFuture<'_, ProviderResult<Vec<CalendarEvent>>> {
        Box::pin(async move {
            self.fetch_impl(&options)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}

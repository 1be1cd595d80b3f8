//! Exchange Web Services provider implementation.

use std::sync::{PoisonError, RwLock};

use freetime_core::CalendarEvent;
use tokio::sync::RwLock as TokioRwLock;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, CalendarProvider, FetchOptions};

use super::client::EwsClient;
use super::config::EwsConfig;
use super::credentials::StoredCredentials;

const PROVIDER_NAME: &str = "ews";

/// Exchange Web Services calendar provider.
///
/// Uses the username and password stored by [`EwsProvider::authenticate`].
/// When no server is configured, the one saved with the credentials is used.
pub struct EwsProvider {
    config: EwsConfig,
    credentials: RwLock<Option<StoredCredentials>>,
    api_client: TokioRwLock<Option<EwsClient>>,
}

impl EwsProvider {
    /// Creates a new EWS provider, loading stored credentials if any.
    pub fn new(mut config: EwsConfig) -> ProviderResult<Self> {
        let credentials = match StoredCredentials::load(&config.credentials_path) {
            Ok(credentials) => credentials,
            Err(e) => {
                debug!("ignoring stored credentials: {}", e);
                None
            }
        };

        if config.server.trim().is_empty()
            && let Some(stored) = credentials.as_ref()
        {
            config.server = stored.server.clone();
        }
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;

        Ok(Self {
            config,
            credentials: RwLock::new(credentials),
            api_client: TokioRwLock::new(None),
        })
    }

    /// The server this provider talks to.
    pub fn server(&self) -> &str {
        &self.config.server
    }

    /// Checks the credentials against the server, then stores them.
    ///
    /// Nothing is written when the server rejects them.
    pub async fn authenticate(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> ProviderResult<()> {
        let credentials = StoredCredentials::new(username, password, self.config.server.clone());
        let client = EwsClient::new(&self.config, &credentials)
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        info!("verifying credentials against {}", client.endpoint());
        client
            .get_calendar_folder()
            .await
            .map_err(|e| e.with_provider(PROVIDER_NAME))?;

        credentials.save(&self.config.credentials_path)?;
        *self
            .credentials
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credentials);
        *self.api_client.write().await = Some(client);

        info!("credentials saved to {:?}", self.config.credentials_path);
        Ok(())
    }

    /// Returns the stored username, if any.
    pub fn username(&self) -> Option<String> {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.username.clone())
    }

    async fn ensure_client(&self) -> ProviderResult<()> {
        if self.api_client.read().await.is_some() {
            return Ok(());
        }

        let credentials = self
            .credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(StoredCredentials::is_complete)
            .ok_or_else(|| {
                ProviderError::authentication("no stored Exchange credentials, run 'freetime auth'")
            })?;

        let client = EwsClient::new(&self.config, &credentials)?;
        *self.api_client.write().await = Some(client);
        Ok(())
    }

    async fn fetch_impl(&self, options: &FetchOptions) -> ProviderResult<Vec<CalendarEvent>> {
        self.ensure_client().await?;

        let (start, end) = options.utc_range();
        debug!("fetching calendar view from {} to {}", start, end);

        let client = self.api_client.read().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ProviderError::internal("API client not available"))?;
        client
            .find_calendar_items(start, end, options.max_results)
            .await
    }
}

impl CalendarProvider for EwsProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn is_authenticated(&self) -> bool {
        self.credentials
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(StoredCredentials::is_complete)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorCode;
    use chrono::NaiveDate;

    #[test]
    fn provider_creation() {
        let dir = tempfile::tempdir().unwrap();
        let config = EwsConfig::new("mail.example.com", dir.path().join("ews.json"));
        let provider = EwsProvider::new(config).unwrap();
        assert_eq!(provider.name(), "ews");
        assert_eq!(provider.server(), "mail.example.com");
        assert!(!provider.is_authenticated());
        assert_eq!(provider.username(), None);
    }

    #[test]
    fn missing_server_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = EwsConfig::new("", dir.path().join("ews.json"));
        let err = EwsProvider::new(config).err().unwrap();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
        assert_eq!(err.provider(), Some("ews"));
    }

    #[test]
    fn server_falls_back_to_stored_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        StoredCredentials::new("jdoe", "pw", "legacy.example.com")
            .save(&path)
            .unwrap();

        let provider = EwsProvider::new(EwsConfig::new("", &path)).unwrap();
        assert_eq!(provider.server(), "legacy.example.com");
        assert!(provider.is_authenticated());
        assert_eq!(provider.username().as_deref(), Some("jdoe"));
    }

    #[test]
    fn configured_server_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        StoredCredentials::new("jdoe", "pw", "old.example.com")
            .save(&path)
            .unwrap();

        let provider = EwsProvider::new(EwsConfig::new("new.example.com", &path)).unwrap();
        assert_eq!(provider.server(), "new.example.com");
    }

    #[tokio::test]
    async fn fetch_without_credentials_is_an_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = EwsConfig::new("mail.example.com", dir.path().join("ews.json"));
        let provider = EwsProvider::new(config).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();

        let err = provider
            .fetch_events(FetchOptions::new(day, day))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(err.provider(), Some("ews"));
    }

    #[tokio::test]
    async fn authenticate_rejects_empty_password_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        let provider = EwsProvider::new(EwsConfig::new("mail.example.com", &path)).unwrap();

        let err = provider.authenticate("jdoe", "").await.unwrap_err();
        assert!(err.is_authentication());
        assert!(!path.exists());
    }
}

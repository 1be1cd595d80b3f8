//! OAuth token storage for Microsoft Graph.
//!
//! Tokens are kept in memory behind a lock and persisted as JSON with
//! owner-only permissions. Writes go through a temporary file and a rename.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::private_file::write_private;

/// Seconds subtracted from the advertised lifetime so tokens are refreshed
/// before the server rejects them.
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Prefix Microsoft may or may not put in front of granted scopes.
const GRAPH_RESOURCE: &str = "https://graph.microsoft.com/";

/// An OAuth token set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,

    pub refresh_token: Option<String>,

    /// When the access token expires, minus a safety buffer.
    pub expires_at: Option<DateTime<Utc>>,

    /// The granted scopes.
    pub scopes: Vec<String>,

    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    /// Creates a token set from token endpoint response data.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expires_in_secs.map(expiry_from_now),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Returns true if the access token is expired or about to expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Utc::now() >= expires_at)
    }

    /// Returns true if every required resource scope was granted.
    ///
    /// `offline_access` is never echoed back by the token endpoint and is
    /// ignored, as is the Graph resource prefix.
    pub fn has_scopes(&self, required: &[String]) -> bool {
        required
            .iter()
            .filter(|scope| !scope.eq_ignore_ascii_case("offline_access"))
            .all(|scope| {
                self.scopes
                    .iter()
                    .any(|granted| scope_name(granted).eq_ignore_ascii_case(scope_name(scope)))
            })
    }

    /// Replaces the tokens after a refresh.
    ///
    /// Microsoft rotates refresh tokens; a missing one keeps the old value.
    pub fn apply_refresh(
        &mut self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) {
        self.access_token = access_token.into();
        if refresh_token.is_some() {
            self.refresh_token = refresh_token;
        }
        self.expires_at = expires_in_secs.map(expiry_from_now);
        self.last_refresh = Utc::now();
    }
}

fn expiry_from_now(secs: i64) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_BUFFER_SECS)
}

fn scope_name(scope: &str) -> &str {
    scope.strip_prefix(GRAPH_RESOURCE).unwrap_or(scope)
}

/// File-backed token storage.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    /// Creates a token storage at the given path. Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads tokens from disk into memory.
    ///
    /// Returns Ok(true) if tokens were loaded, Ok(false) if no file exists.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::internal(format!("failed to read token file: {}", e)).with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::authentication(format!("token file is corrupt: {}", e))
        })?;

        debug!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    /// Saves the current tokens to disk with `0600` permissions.
    pub fn save(&self) -> ProviderResult<()> {
        let content = {
            let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
            let tokens = tokens
                .as_ref()
                .ok_or_else(|| ProviderError::internal("no tokens to save"))?;
            serde_json::to_string_pretty(tokens).map_err(|e| {
                ProviderError::internal(format!("failed to serialize tokens: {}", e))
            })?
        };

        write_private(&self.path, content.as_bytes())?;
        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    /// Returns a clone of the current tokens, if any.
    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sets new tokens and saves them to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        self.save()
    }

    /// Applies a refresh response and saves to disk.
    pub fn apply_refresh(
        &self,
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        {
            let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
            let Some(ref mut t) = *tokens else {
                return Err(ProviderError::internal("no tokens to update"));
            };
            t.apply_refresh(access_token, refresh_token, expires_in_secs);
        }
        self.save()
    }

    /// Clears the stored tokens, in memory and on disk.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::internal(format!("failed to remove token file: {}", e))
                    .with_source(e)
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true if tokens are loaded and not expired.
    pub fn has_valid_tokens(&self) -> bool {
        self.get().is_some_and(|t| !t.is_expired())
    }

    /// Returns true if tokens are loaded and have a refresh token.
    pub fn has_refresh_token(&self) -> bool {
        self.get().is_some_and(|t| t.refresh_token.is_some())
    }

    /// Returns true if the user must go through the browser flow again.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        match self.get() {
            None => true,
            Some(tokens) => !tokens.has_scopes(required_scopes),
        }
    }
}

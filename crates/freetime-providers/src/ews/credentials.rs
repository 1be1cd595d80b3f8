//! Stored Exchange credentials.
//!
//! Basic authentication needs the password on every request, so it is kept
//! in a JSON file readable by the owner only.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::private_file::write_private;

/// Username, password and server saved by `freetime auth`.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoredCredentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub server: String,
}

impl fmt::Debug for StoredCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .finish()
    }
}

impl StoredCredentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server: server.into(),
        }
    }

    /// Returns true if both username and password are present.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Reads credentials from `path`. A missing file yields `None`.
    pub fn load(path: &Path) -> ProviderResult<Option<Self>> {
        if !path.exists() {
            debug!("no credentials file at {:?}", path);
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ProviderError::internal(format!("failed to read credentials file: {}", e))
                .with_source(e)
        })?;
        let credentials = serde_json::from_str(&content).map_err(|e| {
            ProviderError::authentication(format!("credentials file is corrupt: {}", e))
        })?;
        Ok(Some(credentials))
    }

    /// Writes credentials to `path` with `0600` permissions.
    pub fn save(&self, path: &Path) -> ProviderResult<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            ProviderError::internal(format!("failed to serialize credentials: {}", e))
        })?;
        write_private(path, content.as_bytes())?;
        debug!("saved credentials to {:?}", path);
        Ok(())
    }

    /// Returns true if complete credentials are stored at `path`.
    pub fn exists(path: &Path) -> bool {
        matches!(Self::load(path), Ok(Some(c)) if c.is_complete())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ews.json");

        let credentials = StoredCredentials::new("jdoe@example.com", "s3cret", "mail.example.com");
        credentials.save(&path).unwrap();

        let loaded = StoredCredentials::load(&path).unwrap().unwrap();
        assert_eq!(loaded.username, "jdoe@example.com");
        assert_eq!(loaded.password, "s3cret");
        assert_eq!(loaded.server, "mail.example.com");
        assert!(loaded.is_complete());
        assert!(StoredCredentials::exists(&path));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        StoredCredentials::new("u", "p", "s").save(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        assert!(StoredCredentials::load(&path).unwrap().is_none());
        assert!(!StoredCredentials::exists(&path));
    }

    #[test]
    fn incomplete_credentials_do_not_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        fs::write(&path, r#"{"username": "jdoe", "server": "mail.example.com"}"#).unwrap();

        let loaded = StoredCredentials::load(&path).unwrap().unwrap();
        assert!(loaded.password.is_empty());
        assert!(!loaded.is_complete());
        assert!(!StoredCredentials::exists(&path));
    }

    #[test]
    fn corrupt_file_is_an_authentication_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ews.json");
        fs::write(&path, "not json").unwrap();

        let err = StoredCredentials::load(&path).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn debug_hides_password() {
        let credentials = StoredCredentials::new("jdoe", "s3cret", "mail");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("jdoe"));
        assert!(!debug.contains("s3cret"));
    }
}

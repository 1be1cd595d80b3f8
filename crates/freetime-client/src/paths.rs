//! Filesystem locations used by the client.
//!
//! Resolved once at startup and passed to every command, so tests can point
//! the whole client at a temporary directory.

use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "freetime";

/// Configuration and data directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    /// Holds `config.toml`.
    pub config_dir: PathBuf,
    /// Holds tokens and stored credentials.
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolves the directories.
    ///
    /// With `home` set (`--home` or `FREETIME_HOME`) both live in that
    /// directory. Otherwise the platform config and data directories are
    /// used.
    pub fn new(home: Option<&Path>) -> Self {
        match home {
            Some(root) => Self::with_root(root),
            None => Self {
                config_dir: dirs::config_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR),
                data_dir: dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(APP_DIR),
            },
        }
    }

    /// Puts everything under a single directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_dir: root.clone(),
            data_dir: root,
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// OAuth tokens for Microsoft Graph.
    pub fn graph_token_file(&self) -> PathBuf {
        self.data_dir.join("graph_token.json")
    }

    /// Username and password for Exchange Web Services.
    pub fn ews_credentials_file(&self) -> PathBuf {
        self.data_dir.join("ews_credentials.json")
    }

    /// Creates both directories if they do not exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        fs::create_dir_all(&self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_holds_everything() {
        let paths = AppPaths::with_root("/tmp/ft");
        assert_eq!(paths.config_file(), PathBuf::from("/tmp/ft/config.toml"));
        assert_eq!(paths.graph_token_file(), PathBuf::from("/tmp/ft/graph_token.json"));
        assert_eq!(
            paths.ews_credentials_file(),
            PathBuf::from("/tmp/ft/ews_credentials.json")
        );
    }

    #[test]
    fn home_override() {
        let paths = AppPaths::new(Some(Path::new("/srv/freetime")));
        assert_eq!(paths, AppPaths::with_root("/srv/freetime"));
    }

    #[test]
    fn default_dirs_are_app_specific() {
        let paths = AppPaths::new(None);
        assert!(paths.config_dir.ends_with(APP_DIR));
        assert!(paths.data_dir.ends_with(APP_DIR));
    }

    #[test]
    fn ensure_dirs_creates_both() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths {
            config_dir: tmp.path().join("config"),
            data_dir: tmp.path().join("data").join("nested"),
        };
        paths.ensure_dirs().unwrap();
        assert!(paths.config_dir.is_dir());
        assert!(paths.data_dir.is_dir());
    }
}

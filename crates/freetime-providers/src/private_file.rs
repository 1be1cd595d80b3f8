//! Owner-only files for secrets.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{ProviderError, ProviderResult};

/// Writes `content` to `path` atomically with owner-only permissions,
/// creating the parent directory if needed.
pub(crate) fn write_private(path: &Path, content: &[u8]) -> ProviderResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ProviderError::internal(format!("failed to create {}: {}", parent.display(), e))
                .with_source(e)
        })?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let write = |temp: &Path| -> std::io::Result<()> {
        let mut file = options.open(temp)?;
        file.write_all(content)?;
        file.sync_all()?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(temp, fs::Permissions::from_mode(0o600))?;
        }
        fs::rename(temp, path)
    };

    write(&temp_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        ProviderError::internal(format!("failed to write {}: {}", path.display(), e)).with_source(e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_parent_and_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("secret.json");

        write_private(&path, b"first").unwrap();
        write_private(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("a").join("b").join("secret.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.json");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&path, b"new").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

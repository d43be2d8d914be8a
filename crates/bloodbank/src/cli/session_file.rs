//! The file where `bbank` keeps the current session token between runs.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};

/// Read the stored token, if any.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_token(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let token = text.trim();
            Ok((!token.is_empty()).then(|| token.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Store `token`, replacing any previous one.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_token(path: &Path, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    let mut file = open_private(path)?;
    file.write_all(token.as_bytes())?;
    debug!("Stored session token at {}", path.display());
    Ok(())
}

/// Remove the stored token. A missing file is not an error.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be removed.
pub fn clear_token(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Open `path` for writing, owner-only from the moment it exists.
#[cfg(unix)]
fn open_private(path: &Path) -> Result<File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // The mode only applies on creation; tighten a file left by older runs.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    Ok(file)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?)
}

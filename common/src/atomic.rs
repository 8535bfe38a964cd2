//! Whole-file replacement through a temporary sibling.
//!
//! The registry and the project index are rewritten in full on every run. The
//! new contents are written to a temporary file in the same directory and
//! renamed over the target, so readers only ever observe the old or the new
//! document.

use log::debug;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

#[cfg(unix)]
const DEFAULT_MODE: u32 = 0o644;

/// Errors raised by [`replace_file`].
#[derive(Debug, Error)]
pub enum AtomicWriteError {
    /// The target path has no parent directory to stage the write in.
    #[error("cannot write {}: path has no parent directory", path.display())]
    NoParent {
        /// The rejected target path.
        path: PathBuf,
    },

    /// Staging or renaming the replacement failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// The file being replaced.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Replaces the contents of `path` with `contents`.
///
/// The permission bits of an existing file are carried over; new files get
/// `0644` on Unix.
///
/// # Errors
///
/// Returns [`AtomicWriteError`] when the temporary file cannot be created,
/// written, or renamed over `path`.
///
/// # Examples
///
/// ```
/// use docs_release_common::atomic::replace_file;
/// use tempfile::tempdir;
///
/// let dir = tempdir().expect("tempdir");
/// let path = dir.path().join("notes.txt");
/// replace_file(&path, b"first").expect("write");
/// replace_file(&path, b"second").expect("rewrite");
/// assert_eq!(std::fs::read(&path).expect("read"), b"second");
/// ```
pub fn replace_file(path: &Path, contents: &[u8]) -> Result<(), AtomicWriteError> {
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => {
            return Err(AtomicWriteError::NoParent {
                path: path.to_path_buf(),
            });
        }
    };
    let write_error = |source| AtomicWriteError::Write {
        path: path.to_path_buf(),
        source,
    };

    let permissions = match fs::metadata(path) {
        Ok(metadata) => Some(metadata.permissions()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => None,
        Err(err) => return Err(write_error(err)),
    };

    let mut staged = NamedTempFile::new_in(parent).map_err(write_error)?;
    staged.write_all(contents).map_err(write_error)?;
    staged.as_file().sync_all().map_err(write_error)?;
    match permissions {
        Some(permissions) => fs::set_permissions(staged.path(), permissions),
        None => apply_default_permissions(staged.path()),
    }
    .map_err(write_error)?;
    staged.persist(path).map_err(|err| write_error(err.error))?;

    debug!("replaced {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

#[cfg(unix)]
fn apply_default_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(DEFAULT_MODE))
}

#[cfg(not(unix))]
fn apply_default_permissions(_path: &Path) -> io::Result<()> {
    Ok(())
}

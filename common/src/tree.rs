//! Attribute-preserving recursive directory copy.
//!
//! [`copy_tree`] clones every entry below a source directory into a
//! destination directory. Regular files keep their bytes, permission bits and
//! modification time; directories keep their permission bits; symbolic links
//! are recreated with the same target text and are never followed.
//!
//! Entries are visited depth first in lexical file-name order, so a parent is
//! always created before its children are written. The first failure aborts
//! the copy and names the offending path. Nothing is rolled back: callers must
//! treat the destination as indeterminate after an error.

use log::trace;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Filesystem step that failed while copying a tree.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TreeOperation {
    /// Reading entry metadata without following links.
    Stat,
    /// Listing a directory.
    ReadDir,
    /// Reading a symbolic link's target text.
    ReadLink,
    /// Removing a stale destination entry.
    Remove,
    /// Creating a symbolic link.
    Symlink,
    /// Creating a directory.
    CreateDir,
    /// Opening a source file for reading.
    Open,
    /// Creating or truncating a destination file.
    Create,
    /// Streaming file contents.
    Copy,
    /// Applying permission bits.
    SetPermissions,
    /// Applying the modification timestamp.
    SetModified,
}

impl fmt::Display for TreeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Stat => "stat",
            Self::ReadDir => "read directory",
            Self::ReadLink => "readlink",
            Self::Remove => "remove",
            Self::Symlink => "symlink",
            Self::CreateDir => "mkdir",
            Self::Open => "open",
            Self::Create => "create",
            Self::Copy => "copy",
            Self::SetPermissions => "chmod",
            Self::SetModified => "set mtime of",
        };
        f.write_str(label)
    }
}

/// Errors raised by [`copy_tree`].
#[derive(Debug, Error)]
pub enum TreeCopyError {
    /// The copy source exists but is not a directory.
    #[error("source {} is not a directory", path.display())]
    NotADirectory {
        /// The rejected source path.
        path: PathBuf,
    },

    /// The destination is the source directory or lies below it.
    #[error("destination {} lies inside source {}", destination.display(), path.display())]
    DestinationInsideSource {
        /// The source directory.
        path: PathBuf,
        /// The rejected destination.
        destination: PathBuf,
    },

    /// A filesystem operation failed on `path`.
    #[error("{operation} {}: {source}", path.display())]
    Io {
        /// The step that failed.
        operation: TreeOperation,
        /// The path the step was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl TreeCopyError {
    fn io(operation: TreeOperation, path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns the path the failure is attributed to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotADirectory { path }
            | Self::DestinationInsideSource { path, .. }
            | Self::Io { path, .. } => path,
        }
    }
}

/// Counts of entries written by a completed copy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CopySummary {
    /// Regular files copied.
    pub files: usize,
    /// Directories created or reused below the destination root.
    pub directories: usize,
    /// Symbolic links recreated.
    pub symlinks: usize,
}

impl CopySummary {
    /// Returns the total number of entries written.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.files + self.directories + self.symlinks
    }
}

impl fmt::Display for CopySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} file(s), {} director(ies), {} symlink(s)",
            self.files, self.directories, self.symlinks
        )
    }
}

/// Copies the contents of `source` into `destination`.
///
/// `destination` is created with the permission bits of `source` when it does
/// not exist; an existing destination root keeps its own bits. Re-running over
/// a populated destination overwrites files and replaces symbolic links.
///
/// # Errors
///
/// Returns [`TreeCopyError::NotADirectory`] when `source` is not a directory,
/// [`TreeCopyError::DestinationInsideSource`] when `destination` resolves to
/// `source` or a path below it, and [`TreeCopyError::Io`] for the first
/// filesystem failure encountered.
///
/// # Examples
///
/// ```
/// use docs_release_common::tree::copy_tree;
/// use std::fs;
/// use tempfile::tempdir;
///
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let source = tempdir()?;
/// fs::create_dir(source.path().join("guides"))?;
/// fs::write(source.path().join("guides").join("intro.md"), "# Intro")?;
/// let destination = tempdir()?;
/// let target = destination.path().join("v0.15");
///
/// let summary = copy_tree(source.path(), &target)?;
/// assert_eq!(summary.files, 1);
/// assert!(target.join("guides").join("intro.md").exists());
/// # Ok(())
/// # }
/// # demo().expect("copy succeeds");
/// ```
pub fn copy_tree(source: &Path, destination: &Path) -> Result<CopySummary, TreeCopyError> {
    let metadata =
        fs::symlink_metadata(source).map_err(TreeCopyError::io(TreeOperation::Stat, source))?;
    if !metadata.is_dir() {
        return Err(TreeCopyError::NotADirectory {
            path: source.to_path_buf(),
        });
    }

    let resolved_source =
        fs::canonicalize(source).map_err(TreeCopyError::io(TreeOperation::Stat, source))?;
    if resolve(destination).starts_with(&resolved_source) {
        return Err(TreeCopyError::DestinationInsideSource {
            path: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }

    let existing_root = fs::metadata(destination).ok().filter(fs::Metadata::is_dir);
    let mut summary = CopySummary::default();
    create_directory(destination, &metadata)?;
    copy_children(source, destination, &mut summary)?;
    apply_permissions(destination, existing_root.as_ref().unwrap_or(&metadata))?;
    Ok(summary)
}

/// Canonicalises the longest existing prefix of `path`.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(real) = fs::canonicalize(path) {
        return real;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => resolve(parent).join(name),
        _ => path.to_path_buf(),
    }
}

fn copy_children(
    source: &Path,
    destination: &Path,
    summary: &mut CopySummary,
) -> Result<(), TreeCopyError> {
    for entry_path in sorted_entries(source)? {
        let Some(name) = entry_path.file_name() else {
            continue;
        };
        let target = destination.join(name);
        let metadata = fs::symlink_metadata(&entry_path)
            .map_err(TreeCopyError::io(TreeOperation::Stat, &entry_path))?;
        let file_type = metadata.file_type();

        if file_type.is_symlink() {
            copy_symlink(&entry_path, &target)?;
            summary.symlinks += 1;
        } else if file_type.is_dir() {
            trace!("mkdir {}", target.display());
            create_directory(&target, &metadata)?;
            copy_children(&entry_path, &target, summary)?;
            apply_permissions(&target, &metadata)?;
            summary.directories += 1;
        } else {
            copy_file(&entry_path, &target, &metadata)?;
            summary.files += 1;
        }
    }
    Ok(())
}

fn sorted_entries(directory: &Path) -> Result<Vec<PathBuf>, TreeCopyError> {
    let read_error = TreeCopyError::io(TreeOperation::ReadDir, directory);
    let mut entries = fs::read_dir(directory)
        .and_then(|iter| {
            iter.map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()
        })
        .map_err(read_error)?;
    entries.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
    Ok(entries)
}

fn copy_symlink(source: &Path, target: &Path) -> Result<(), TreeCopyError> {
    let link_target =
        fs::read_link(source).map_err(TreeCopyError::io(TreeOperation::ReadLink, source))?;
    remove_stale_entry(target)?;
    trace!("symlink {} -> {}", target.display(), link_target.display());
    create_symlink(source, &link_target, target)
        .map_err(TreeCopyError::io(TreeOperation::Symlink, target))
}

fn copy_file(source: &Path, target: &Path, metadata: &fs::Metadata) -> Result<(), TreeCopyError> {
    trace!("copy {} -> {}", source.display(), target.display());
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(TreeCopyError::io(TreeOperation::CreateDir, parent))?;
    }
    // Writing through a stale symlink would modify whatever it points at, and
    // a read-only leftover cannot be truncated.
    if fs::symlink_metadata(target).is_ok_and(|existing| {
        existing.file_type().is_symlink() || existing.permissions().readonly()
    }) {
        remove_stale_entry(target)?;
    }

    let mut input =
        fs::File::open(source).map_err(TreeCopyError::io(TreeOperation::Open, source))?;
    let mut output = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(target)
        .map_err(TreeCopyError::io(TreeOperation::Create, target))?;
    io::copy(&mut input, &mut output).map_err(TreeCopyError::io(TreeOperation::Copy, target))?;

    fs::set_permissions(target, metadata.permissions())
        .map_err(TreeCopyError::io(TreeOperation::SetPermissions, target))?;
    let modified = metadata
        .modified()
        .map_err(TreeCopyError::io(TreeOperation::Stat, source))?;
    output
        .set_modified(modified)
        .map_err(TreeCopyError::io(TreeOperation::SetModified, target))
}

fn remove_stale_entry(target: &Path) -> Result<(), TreeCopyError> {
    match fs::remove_file(target) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(TreeCopyError::io(TreeOperation::Remove, target)(err)),
    }
}

#[cfg(unix)]
fn create_directory(path: &Path, source: &fs::Metadata) -> Result<(), TreeCopyError> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    // Owner access is kept until the children are written; the exact bits are
    // applied afterwards by `apply_permissions`.
    let mode = source.permissions().mode() | 0o700;
    fs::DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .map_err(TreeCopyError::io(TreeOperation::CreateDir, path))?;

    // A directory left by an earlier run may be read-only.
    let existing = fs::metadata(path)
        .map_err(TreeCopyError::io(TreeOperation::Stat, path))?
        .permissions()
        .mode();
    if existing & 0o700 == 0o700 {
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(existing | 0o700))
        .map_err(TreeCopyError::io(TreeOperation::SetPermissions, path))
}

#[cfg(not(unix))]
fn create_directory(path: &Path, _source: &fs::Metadata) -> Result<(), TreeCopyError> {
    fs::create_dir_all(path).map_err(TreeCopyError::io(TreeOperation::CreateDir, path))
}

fn apply_permissions(path: &Path, source: &fs::Metadata) -> Result<(), TreeCopyError> {
    fs::set_permissions(path, source.permissions())
        .map_err(TreeCopyError::io(TreeOperation::SetPermissions, path))
}

#[cfg(unix)]
fn create_symlink(_source: &Path, link_target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link_target, link)
}

#[cfg(windows)]
fn create_symlink(source: &Path, link_target: &Path, link: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    if fs::metadata(source).is_ok_and(|resolved| resolved.is_dir()) {
        symlink_dir(link_target, link)
    } else {
        symlink_file(link_target, link)
    }
}

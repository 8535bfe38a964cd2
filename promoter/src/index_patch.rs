//! Rewrites the "latest version" link in a project's root index.

use camino::{Utf8Path, Utf8PathBuf};
use docs_release_common::{AtomicWriteError, replace_file};
use log::{debug, warn};
use regex::{NoExpand, Regex};
use thiserror::Error;

/// Errors raised while patching the root index.
#[derive(Debug, Error)]
pub enum IndexPatchError {
    /// The index could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Index location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The link pattern could not be compiled.
    #[error("invalid latest-link pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// The patched index could not be written.
    #[error(transparent)]
    Write(#[from] AtomicWriteError),
}

/// Result of patching an index file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PatchOutcome {
    /// Number of links rewritten.
    pub replacements: usize,
    /// File contents before patching.
    pub original: String,
}

/// Points every `[latest version](/<project>-docs/v.../)` link at `version`.
///
/// Returns the rewritten text and the number of links found.
///
/// # Errors
///
/// Returns [`IndexPatchError::Pattern`] if the link pattern cannot be built.
///
/// # Examples
///
/// ```
/// use docs_release_promoter::index_patch::rewrite_latest_link;
///
/// let text = "See the [latest version](/eso-docs/v0.14.0/).";
/// let (patched, count) = rewrite_latest_link(text, "eso", "v0.15.0").expect("pattern");
/// assert_eq!(patched, "See the [latest version](/eso-docs/v0.15.0/).");
/// assert_eq!(count, 1);
/// ```
pub fn rewrite_latest_link(
    text: &str,
    project: &str,
    version: &str,
) -> Result<(String, usize), IndexPatchError> {
    let pattern = Regex::new(&format!(
        r"\[latest version\]\(/{}-docs/v[\d.]+/\)",
        regex::escape(project)
    ))?;
    let count = pattern.find_iter(text).count();
    let replacement = format!("[latest version](/{project}-docs/{version}/)");
    let patched = pattern.replace_all(text, NoExpand(&replacement));
    Ok((patched.into_owned(), count))
}

/// Patches the index file at `path` in place.
///
/// An index without a matching link is written back unchanged and a warning
/// is logged.
///
/// # Errors
///
/// Returns [`IndexPatchError`] when the file cannot be read or replaced.
pub fn patch_latest_link(
    path: &Utf8Path,
    project: &str,
    version: &str,
) -> Result<PatchOutcome, IndexPatchError> {
    let original = std::fs::read_to_string(path).map_err(|source| IndexPatchError::Read {
        path: path.to_owned(),
        source,
    })?;
    let (patched, replacements) = rewrite_latest_link(&original, project, version)?;
    if replacements == 0 {
        warn!("no latest-version link found in {path}; leaving it unchanged");
    } else {
        debug!("rewrote {replacements} latest-version link(s) in {path}");
    }
    replace_file(path.as_std_path(), patched.as_bytes())?;
    Ok(PatchOutcome {
        replacements,
        original,
    })
}

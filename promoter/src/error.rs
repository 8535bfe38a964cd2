//! Error types for the documentation release promoter.
//!
//! Each variant names the file, tag, or step involved so that an operator can
//! act on the message without re-running with extra logging.

use crate::index_patch::IndexPatchError;
use crate::inference::InferenceError;
use crate::pipeline::Stage;
use crate::registry::RegistryError;
use camino::Utf8PathBuf;
use docs_release::ConfigError;
use docs_release_common::{AtomicWriteError, TreeCopyError};
use thiserror::Error;

/// Errors that can occur while promoting a release.
#[derive(Debug, Error)]
pub enum PromoteError {
    /// The command line was incomplete or inconsistent.
    #[error("usage: {message}")]
    Usage {
        /// What was wrong with the invocation.
        message: String,
    },

    /// The site configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The version registry could not be used.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Tested versions could not be inferred from upstream.
    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// Copying the unreleased content tree failed.
    #[error(transparent)]
    Copy(#[from] TreeCopyError),

    /// A generated file could not be written.
    #[error(transparent)]
    Write(#[from] AtomicWriteError),

    /// The project's root index could not be patched.
    #[error(transparent)]
    IndexPatch(#[from] IndexPatchError),

    /// A directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the machine-readable output failed.
    #[error("failed to render JSON output: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing command output failed.
    #[error("failed to write output: {source}")]
    Output {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A promotion step failed; earlier steps may have been rolled back.
    #[error("promotion failed while {stage}: {source}")]
    StepFailed {
        /// The step that was running.
        stage: Stage,
        /// What went wrong.
        #[source]
        source: Box<PromoteError>,
    },
}

impl PromoteError {
    /// Creates a usage error.
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    /// Returns the step a failure occurred in, if it happened mid-promotion.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StepFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Result type for promoter operations.
pub type Result<T> = std::result::Result<T, PromoteError>;

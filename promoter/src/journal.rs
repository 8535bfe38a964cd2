//! Compensating actions for a partially applied promotion.
//!
//! A promotion touches the registry, the content tree, and the root index
//! in sequence. Each completed mutation records how to undo itself; if a
//! later step fails, the journal replays those actions newest first.

use camino::Utf8PathBuf;
use docs_release_common::replace_file;
use log::{debug, warn};
use std::fmt;

/// A single compensating action.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UndoAction {
    /// Put a file's previous contents back.
    RestoreFile {
        /// File to restore.
        path: Utf8PathBuf,
        /// Contents before the run modified it.
        contents: Vec<u8>,
    },
    /// Remove a directory the run created.
    RemoveDirectory {
        /// Directory to remove, recursively.
        path: Utf8PathBuf,
    },
}

impl UndoAction {
    fn apply(&self) -> std::io::Result<()> {
        match self {
            Self::RestoreFile { path, contents } => replace_file(path.as_std_path(), contents)
                .map_err(std::io::Error::other),
            Self::RemoveDirectory { path } => std::fs::remove_dir_all(path),
        }
    }
}

impl fmt::Display for UndoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RestoreFile { path, .. } => write!(f, "restore {path}"),
            Self::RemoveDirectory { path } => write!(f, "remove {path}"),
        }
    }
}

/// A compensating action that could not be applied.
#[derive(Debug)]
pub struct RollbackFailure {
    /// The action that failed.
    pub action: UndoAction,
    /// Why it failed.
    pub error: std::io::Error,
}

/// Outcome of replaying a journal.
#[derive(Debug, Default)]
pub struct RollbackReport {
    /// Actions applied successfully, in the order they ran.
    pub undone: Vec<UndoAction>,
    /// Actions that failed.
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    /// Returns true when every action was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered record of compensating actions for one run.
#[derive(Debug, Default)]
pub struct UndoJournal {
    actions: Vec<UndoAction>,
}

impl UndoJournal {
    /// Creates an empty journal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the compensation for a completed step.
    pub fn record(&mut self, action: UndoAction) {
        debug!("journal: {action}");
        self.actions.push(action);
    }

    /// Returns the recorded actions, oldest first.
    #[must_use]
    pub fn actions(&self) -> &[UndoAction] {
        &self.actions
    }

    /// Discards the journal after a successful run.
    pub fn commit(self) {
        debug!("journal committed with {} action(s)", self.actions.len());
    }

    /// Applies every recorded action, newest first.
    ///
    /// Failures are logged and collected; the remaining actions still run.
    #[must_use]
    pub fn rollback(self) -> RollbackReport {
        let mut report = RollbackReport::default();
        for action in self.actions.into_iter().rev() {
            match action.apply() {
                Ok(()) => {
                    debug!("rolled back: {action}");
                    report.undone.push(action);
                }
                Err(error) => {
                    warn!("rollback could not {action}: {error}");
                    report.failures.push(RollbackFailure { action, error });
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    #[fixture]
    fn site() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8");
        (dir, root)
    }

    #[rstest]
    fn rollback_restores_files_and_removes_directories(site: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = site;
        let file = root.join("versions.toml");
        let created = root.join("v0.15.0");
        std::fs::write(&file, "modified").expect("seed file");
        std::fs::create_dir_all(created.join("nested")).expect("seed dir");

        let mut journal = UndoJournal::new();
        journal.record(UndoAction::RestoreFile {
            path: file.clone(),
            contents: b"original".to_vec(),
        });
        journal.record(UndoAction::RemoveDirectory {
            path: created.clone(),
        });
        let report = journal.rollback();

        assert!(report.is_clean());
        assert_eq!(std::fs::read_to_string(&file).expect("read"), "original");
        assert!(!created.exists());
    }

    #[rstest]
    fn rollback_runs_newest_first() {
        let mut journal = UndoJournal::new();
        let first = UndoAction::RemoveDirectory {
            path: Utf8PathBuf::from("/nonexistent/first"),
        };
        let second = UndoAction::RemoveDirectory {
            path: Utf8PathBuf::from("/nonexistent/second"),
        };
        journal.record(first.clone());
        journal.record(second.clone());

        let report = journal.rollback();

        let order: Vec<_> = report.failures.into_iter().map(|f| f.action).collect();
        assert_eq!(order, vec![second, first]);
    }

    #[rstest]
    fn failures_do_not_stop_remaining_actions(site: (TempDir, Utf8PathBuf)) {
        let (_guard, root) = site;
        let file = root.join("_index.md");
        std::fs::write(&file, "patched").expect("seed");

        let mut journal = UndoJournal::new();
        journal.record(UndoAction::RestoreFile {
            path: file.clone(),
            contents: b"before".to_vec(),
        });
        journal.record(UndoAction::RemoveDirectory {
            path: root.join("missing"),
        });
        let report = journal.rollback();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.undone.len(), 1);
        assert_eq!(std::fs::read_to_string(&file).expect("read"), "before");
    }

    #[rstest]
    fn display_names_the_path() {
        let action = UndoAction::RestoreFile {
            path: Utf8PathBuf::from("data/eso_versions.toml"),
            contents: Vec::new(),
        };
        assert_eq!(action.to_string(), "restore data/eso_versions.toml");
    }
}

//! Test support utilities for promoter behavioural tests.
//!
//! Provides a throwaway documentation site laid out like the real one and a
//! manifest fetcher that replays scripted responses instead of touching the
//! network.

use camino::{Utf8Path, Utf8PathBuf};
use docs_release_promoter::inference::{FetchError, ManifestFetcher};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use tempfile::TempDir;

/// Registry with a single latest release, as written by a previous run.
pub const REGISTRY: &str = r#"[[versions]]
version = "v0.14.0"
url = "/eso-docs/v0.14.0/"
tag = "v0.14.0"
latest = true
release_date = "2025-01-10"
tested_k8s_versions = ["v1.31"]
end_of_life = ""
"#;

/// Root index linking to the current latest release.
pub const INDEX: &str = "\
+++
title = \"External Secrets Operator\"
+++

Start with the [latest version](/eso-docs/v0.14.0/).
";

/// A temporary documentation site with an `eso` project.
pub struct Site {
    _temp: TempDir,
    root: Utf8PathBuf,
}

impl Site {
    /// Creates the site with a registry, a root index, and unreleased content.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        let site = Self { _temp: temp, root };
        site.write("data/eso_versions.toml", REGISTRY);
        site.write("content/en/eso-docs/_index.md", INDEX);
        site.write("content/en/eso-docs/unreleased/_index.md", "unreleased\n");
        site.write(
            "content/en/eso-docs/unreleased/guides/getting-started.md",
            "# Getting started\n",
        );
        site
    }

    /// The site root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Resolves a site-relative path.
    pub fn path(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative)
    }

    /// Writes a site-relative file, creating parent directories.
    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&path, contents).expect("failed to write site file");
    }

    /// Reads a site-relative file.
    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path(relative)).expect("failed to read site file")
    }
}

/// Manifest fetcher that replays queued responses in order.
pub struct ScriptedFetcher {
    responses: RefCell<VecDeque<Result<String, FetchError>>>,
    calls: Cell<usize>,
}

impl ScriptedFetcher {
    /// Creates a fetcher that answers with `responses`, one per call.
    pub fn new(responses: Vec<Result<String, FetchError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into()),
            calls: Cell::new(0),
        }
    }

    /// Creates a fetcher that fails every call.
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    /// Number of fetches performed so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ManifestFetcher for ScriptedFetcher {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.calls.set(self.calls.get() + 1);
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| {
                Err(FetchError::Transport {
                    url: url.to_owned(),
                    reason: "no scripted response".to_owned(),
                })
            })
    }
}

//! Site-wide configuration for the release tooling.
//!
//! The documentation site keeps optional overrides in `docs-release.toml` at
//! the site root. `ReleaseConfig` captures where the content and data trees
//! live, how the upstream manifest is fetched, and which projects can be
//! released. Every field falls back to the values the site has always used,
//! so a missing file is equivalent to an empty one.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

/// File name looked up at the site root when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "docs-release.toml";

/// Placeholder substituted with the release tag in manifest URL templates.
pub const TAG_PLACEHOLDER: &str = "{tag}";

const DEFAULT_DEPENDENCY: &str = "k8s.io/client-go";

/// Errors raised while locating or parsing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("configuration file not found at {path}")]
    NotFound {
        /// Path that was requested.
        path: Utf8PathBuf,
    },

    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file {path}")]
    Read {
        /// Path of the unreadable file.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML or has unknown fields.
    #[error("invalid configuration file {path}: {source}")]
    Parse {
        /// Path of the malformed file.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A project's manifest URL template has no `{tag}` placeholder.
    #[error("manifest_url for project {project} must contain the {{tag}} placeholder")]
    MissingTagPlaceholder {
        /// Identifier of the misconfigured project.
        project: String,
    },
}

/// Configuration for one release run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    /// Directory holding the per-project `<id>-docs` content trees, relative
    /// to the site root.
    pub content_root: Utf8PathBuf,
    /// Directory holding the `<id>_versions.toml` registries, relative to the
    /// site root.
    pub data_dir: Utf8PathBuf,
    /// Network policy for upstream manifest retrieval.
    pub fetch: FetchPolicy,
    /// Known projects keyed by identifier.
    ///
    /// A configuration file that declares any project replaces the built-in
    /// catalogue wholesale rather than merging with it.
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            content_root: Utf8PathBuf::from("content/en"),
            data_dir: Utf8PathBuf::from("data"),
            fetch: FetchPolicy::default(),
            projects: builtin_projects(),
        }
    }
}

impl ReleaseConfig {
    /// Loads the configuration for a site.
    ///
    /// With an explicit path the file must exist. Otherwise
    /// `<site_root>/docs-release.toml` is used when present and the defaults
    /// apply when it is not.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit file is missing, when the file
    /// cannot be read or parsed, or when a project template lacks the tag
    /// placeholder.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use docs_release::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::load(Utf8Path::new("/nonexistent/site"), None)
    ///     .expect("defaults apply without a file");
    /// assert!(config.project("eso").is_some());
    /// ```
    pub fn load(site_root: &Utf8Path, explicit: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_owned(),
                });
            }
            Some(path) => path.to_owned(),
            None => {
                let candidate = site_root.join(CONFIG_FILE_NAME);
                if !candidate.exists() {
                    return Ok(Self::default());
                }
                candidate
            }
        };

        let source = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml(&path, &source)
    }

    /// Parses configuration text, attributing errors to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::MissingTagPlaceholder`] for unusable URL templates.
    pub fn from_toml(path: &Utf8Path, source: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        if config.projects.is_empty() {
            config.projects = builtin_projects();
        }
        config.validate()?;
        Ok(config)
    }

    /// Returns the project registered under `id`.
    #[must_use]
    pub fn project(&self, id: &str) -> Option<&ProjectConfig> {
        self.projects.get(id)
    }

    /// Returns the known project identifiers in sorted order.
    pub fn project_ids(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match self
            .projects
            .iter()
            .find(|(_, project)| !project.manifest_url.contains(TAG_PLACEHOLDER))
        {
            Some((id, _)) => Err(ConfigError::MissingTagPlaceholder {
                project: id.clone(),
            }),
            None => Ok(()),
        }
    }
}

/// Static details for one documented project.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Human-readable project name used in page titles.
    pub long_name: String,
    /// URL of the upstream `go.mod`, with `{tag}` standing in for the release.
    pub manifest_url: String,
    /// Module path whose version tracks the tested Kubernetes release.
    #[serde(default = "default_dependency")]
    pub dependency: String,
}

impl ProjectConfig {
    /// Renders the manifest URL for a release tag.
    ///
    /// # Examples
    ///
    /// ```
    /// use docs_release::ReleaseConfig;
    ///
    /// let config = ReleaseConfig::default();
    /// let url = config.project("reloader").expect("built in").manifest_url_for("v1.2.0");
    /// assert!(url.ends_with("/reloader/v1.2.0/go.mod"));
    /// ```
    #[must_use]
    pub fn manifest_url_for(&self, tag: &str) -> String {
        self.manifest_url.replace(TAG_PLACEHOLDER, tag)
    }
}

fn default_dependency() -> String {
    DEFAULT_DEPENDENCY.to_owned()
}

fn builtin_projects() -> BTreeMap<String, ProjectConfig> {
    let project = |long_name: &str, repo: &str| ProjectConfig {
        long_name: long_name.to_owned(),
        manifest_url: format!(
            "https://raw.githubusercontent.com/external-secrets/{repo}/{TAG_PLACEHOLDER}/go.mod"
        ),
        dependency: default_dependency(),
    };

    BTreeMap::from([
        (
            "eso".to_owned(),
            project("External-Secrets Operator", "external-secrets"),
        ),
        ("reloader".to_owned(), project("Reloader Operator", "reloader")),
    ])
}

/// Timeout and retry settings for upstream manifest retrieval.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchPolicy {
    /// Global per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Total number of attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for the doubling retry delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 4_000,
        }
    }
}

impl FetchPolicy {
    /// Returns the request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the number of attempts, never less than one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    ///
    /// # Examples
    ///
    /// ```
    /// use docs_release::FetchPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = FetchPolicy::default();
    /// assert_eq!(policy.backoff_after(1), Duration::from_millis(500));
    /// assert_eq!(policy.backoff_after(2), Duration::from_millis(1_000));
    /// assert_eq!(policy.backoff_after(10), Duration::from_millis(4_000));
    /// ```
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(32);
        let millis = self
            .initial_backoff_ms
            .saturating_mul(1_u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_match_the_site_layout() {
        let config = ReleaseConfig::default();

        assert_eq!(config.content_root, "content/en");
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.project_ids().collect::<Vec<_>>(), ["eso", "reloader"]);
        assert_eq!(
            config.project("eso").map(|p| p.long_name.as_str()),
            Some("External-Secrets Operator")
        );
    }

    #[rstest]
    fn renders_manifest_url_for_tag() {
        let config = ReleaseConfig::default();
        let eso = config.project("eso").expect("eso is built in");

        assert_eq!(
            eso.manifest_url_for("v0.15.0"),
            "https://raw.githubusercontent.com/external-secrets/external-secrets/v0.15.0/go.mod"
        );
    }

    #[rstest]
    fn deserialises_fetch_overrides() {
        let source = "[fetch]\nattempts = 5\ntimeout_secs = 2\n";

        let config = ReleaseConfig::from_toml(Utf8Path::new("docs-release.toml"), source)
            .expect("expected configuration to parse successfully");

        assert_eq!(config.fetch.attempts(), 5);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(2));
        assert_eq!(config.fetch.initial_backoff_ms, 500);
        assert_eq!(config.projects.len(), 2, "built-in catalogue is kept");
    }

    #[rstest]
    fn declared_projects_replace_the_catalogue() {
        let source = concat!(
            "[projects.demo]\n",
            "long_name = \"Demo Operator\"\n",
            "manifest_url = \"https://example.test/{tag}/go.mod\"\n",
        );

        let config = ReleaseConfig::from_toml(Utf8Path::new("docs-release.toml"), source)
            .expect("expected configuration to parse successfully");

        assert_eq!(config.project_ids().collect::<Vec<_>>(), ["demo"]);
        let demo = config.project("demo").expect("demo declared");
        assert_eq!(demo.dependency, "k8s.io/client-go");
    }

    #[rstest]
    fn rejects_templates_without_tag_placeholder() {
        let source = concat!(
            "[projects.demo]\n",
            "long_name = \"Demo\"\n",
            "manifest_url = \"https://example.test/main/go.mod\"\n",
        );

        let outcome = ReleaseConfig::from_toml(Utf8Path::new("docs-release.toml"), source);

        assert!(matches!(
            outcome,
            Err(ConfigError::MissingTagPlaceholder { ref project }) if project == "demo"
        ));
    }

    #[rstest]
    fn rejects_unknown_fields() {
        let source = "unexpected = true\n";

        let outcome = ReleaseConfig::from_toml(Utf8Path::new("docs-release.toml"), source);

        assert!(matches!(outcome, Err(ConfigError::Parse { .. })));
    }

    #[rstest]
    fn zero_attempts_still_tries_once() {
        let policy = FetchPolicy {
            attempts: 0,
            ..FetchPolicy::default()
        };

        assert_eq!(policy.attempts(), 1);
    }

    #[rstest]
    fn missing_site_file_falls_back_to_defaults() {
        let site = tempfile::tempdir().expect("create tempdir");
        let root = Utf8Path::from_path(site.path()).expect("utf-8 temp path");

        let config = ReleaseConfig::load(root, None).expect("defaults apply");

        assert_eq!(config, ReleaseConfig::default());
    }

    #[rstest]
    fn explicit_missing_file_is_an_error() {
        let site = tempfile::tempdir().expect("create tempdir");
        let root = Utf8Path::from_path(site.path()).expect("utf-8 temp path");
        let explicit = root.join("elsewhere.toml");

        let outcome = ReleaseConfig::load(root, Some(&explicit));

        assert!(matches!(outcome, Err(ConfigError::NotFound { .. })));
    }

    #[rstest]
    fn site_file_is_picked_up() {
        let site = tempfile::tempdir().expect("create tempdir");
        let root = Utf8Path::from_path(site.path()).expect("utf-8 temp path");
        std::fs::write(root.join(CONFIG_FILE_NAME), "data_dir = \"registry\"\n")
            .expect("write config");

        let config = ReleaseConfig::load(root, None).expect("config loads");

        assert_eq!(config.data_dir, "registry");
    }
}

//! Persisted release history for one documentation project.
//!
//! Each project keeps a `data/<project>_versions.toml` file holding a
//! `[[versions]]` array, newest release first. Exactly one record carries
//! `latest = true` once a promotion has settled.

use camino::{Utf8Path, Utf8PathBuf};
use docs_release_common::{AtomicWriteError, replace_file};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Suffix older registries appended to the latest record's `version`.
const LEGACY_LATEST_SUFFIX: &str = " (latest)";

/// Errors raised while loading, validating, or saving a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry file does not exist.
    #[error("version registry not found at {path}")]
    NotFound {
        /// Expected registry location.
        path: Utf8PathBuf,
    },

    /// The registry file could not be read.
    #[error("failed to read version registry {path}: {source}")]
    Read {
        /// Registry location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The registry is not valid TOML or does not match the record schema.
    #[error("failed to parse version registry {path}: {source}")]
    Parse {
        /// Registry location.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// The in-memory registry could not be serialised.
    #[error("failed to serialise version registry {path}: {source}")]
    Serialize {
        /// Registry location.
        path: Utf8PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::ser::Error,
    },

    /// Writing the registry back to disk failed.
    #[error(transparent)]
    Write(#[from] AtomicWriteError),

    /// No record is marked as the latest release.
    #[error("no release is marked latest in {path}")]
    NoLatest {
        /// Registry location.
        path: Utf8PathBuf,
    },

    /// The requested tag has already been released.
    #[error("release {tag} already exists in {path}")]
    DuplicateRelease {
        /// The rejected tag.
        tag: String,
        /// Registry location.
        path: Utf8PathBuf,
    },
}

/// One released documentation version.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseRecord {
    /// Version label; stored as the bare tag.
    pub version: String,
    /// Site-relative URL of the version's documentation root.
    pub url: String,
    /// Canonical release tag, for example `v0.15.0`.
    pub tag: String,
    /// Whether this record is the current release.
    pub latest: bool,
    /// Release date in `YYYY-MM-DD` form.
    pub release_date: String,
    /// Kubernetes versions the release was tested against.
    pub tested_k8s_versions: Vec<String>,
    /// End-of-life date, empty while supported.
    pub end_of_life: String,
}

impl ReleaseRecord {
    /// Builds the record for a freshly promoted release.
    ///
    /// # Examples
    ///
    /// ```
    /// use docs_release_promoter::registry::ReleaseRecord;
    ///
    /// let record =
    ///     ReleaseRecord::new_latest("eso", "v0.15.0", "2025-03-01", vec!["v1.32".into()]);
    /// assert_eq!(record.url, "/eso-docs/v0.15.0/");
    /// assert_eq!(record.display_version(), "v0.15.0 (latest)");
    /// ```
    #[must_use]
    pub fn new_latest(
        project: &str,
        tag: &str,
        release_date: &str,
        tested_k8s_versions: Vec<String>,
    ) -> Self {
        Self {
            version: tag.to_owned(),
            url: format!("/{project}-docs/{tag}/"),
            tag: tag.to_owned(),
            latest: true,
            release_date: release_date.to_owned(),
            tested_k8s_versions,
            end_of_life: String::new(),
        }
    }

    /// Returns the version label shown to readers.
    #[must_use]
    pub fn display_version(&self) -> String {
        if self.latest {
            format!("{}{LEGACY_LATEST_SUFFIX}", self.version)
        } else {
            self.version.clone()
        }
    }

    fn matches_tag(&self, tag: &str) -> bool {
        self.tag == tag || self.version == tag
    }
}

#[derive(Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
struct RegistryDocument {
    versions: Vec<ReleaseRecord>,
}

/// The ordered release history of a project, bound to its file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VersionRegistry {
    path: Utf8PathBuf,
    versions: Vec<ReleaseRecord>,
}

impl VersionRegistry {
    /// Reads the registry at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] when the file is absent,
    /// [`RegistryError::Read`] when it cannot be read, and
    /// [`RegistryError::Parse`] when it is malformed.
    pub fn load(path: &Utf8Path) -> Result<Self, RegistryError> {
        let text = read_registry_text(path)?;
        Self::from_toml_str(path, &text)
    }

    /// Parses registry text, attributing errors to `path`.
    ///
    /// Legacy ` (latest)` suffixes on `version` are dropped; the label is
    /// derived from the `latest` flag instead.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Parse`] when the text is malformed.
    pub fn from_toml_str(path: &Utf8Path, text: &str) -> Result<Self, RegistryError> {
        let document: RegistryDocument =
            toml::from_str(text).map_err(|source| RegistryError::Parse {
                path: path.to_owned(),
                source,
            })?;
        let versions = document
            .versions
            .into_iter()
            .map(|mut record| {
                strip_legacy_suffix(&mut record.version);
                record
            })
            .collect();
        Ok(Self {
            path: path.to_owned(),
            versions,
        })
    }

    /// Creates an in-memory registry for `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, versions: Vec<ReleaseRecord>) -> Self {
        Self {
            path: path.into(),
            versions,
        }
    }

    /// Returns the file this registry is bound to.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the records, newest first.
    #[must_use]
    pub fn records(&self) -> &[ReleaseRecord] {
        &self.versions
    }

    /// Locates the record marked latest.
    ///
    /// When several records claim to be latest, the first one wins.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NoLatest`] when no record is marked latest.
    pub fn find_latest(&self) -> Result<(usize, &ReleaseRecord), RegistryError> {
        let mut candidates = self
            .versions
            .iter()
            .enumerate()
            .filter(|(_, record)| record.latest);
        let (index, record) = candidates.next().ok_or_else(|| RegistryError::NoLatest {
            path: self.path.clone(),
        })?;
        let extra = candidates.count();
        if extra > 0 {
            warn!(
                "{} marks {} releases as latest; using {}",
                self.path,
                extra + 1,
                record.tag
            );
        }
        Ok((index, record))
    }

    /// Fails when `tag` has already been released.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateRelease`] when any record's tag or
    /// version equals `tag`.
    pub fn assert_no_duplicate(&self, tag: &str) -> Result<(), RegistryError> {
        if self.versions.iter().any(|record| record.matches_tag(tag)) {
            return Err(RegistryError::DuplicateRelease {
                tag: tag.to_owned(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Supersedes the current latest release with `record`.
    ///
    /// The record at `old_latest` loses its latest flag, as does any other
    /// stale claimant, and `record` is inserted at the front marked latest.
    pub fn promote(&mut self, old_latest: usize, mut record: ReleaseRecord) {
        if let Some(old) = self.versions.get_mut(old_latest) {
            debug!("superseding {} in {}", old.tag, self.path);
            strip_legacy_suffix(&mut old.version);
        }
        for existing in &mut self.versions {
            existing.latest = false;
        }
        record.latest = true;
        self.versions.insert(0, record);
    }

    /// Serialises the registry as a `[[versions]]` document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serialize`] when serialisation fails.
    pub fn to_toml_string(&self) -> Result<String, RegistryError> {
        let document = RegistryDocument {
            versions: self.versions.clone(),
        };
        toml::to_string(&document).map_err(|source| RegistryError::Serialize {
            path: self.path.clone(),
            source,
        })
    }

    /// Replaces the registry file with the current records.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Serialize`] or [`RegistryError::Write`].
    pub fn save(&self) -> Result<(), RegistryError> {
        let text = self.to_toml_string()?;
        replace_file(self.path.as_std_path(), text.as_bytes())?;
        debug!("saved {} release(s) to {}", self.versions.len(), self.path);
        Ok(())
    }
}

/// Reads a registry file, mapping a missing file to [`RegistryError::NotFound`].
///
/// # Errors
///
/// Returns [`RegistryError::NotFound`] or [`RegistryError::Read`].
pub fn read_registry_text(path: &Utf8Path) -> Result<String, RegistryError> {
    std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            RegistryError::NotFound {
                path: path.to_owned(),
            }
        } else {
            RegistryError::Read {
                path: path.to_owned(),
                source,
            }
        }
    })
}

fn strip_legacy_suffix(version: &mut String) {
    if let Some(bare) = version.strip_suffix(LEGACY_LATEST_SUFFIX) {
        *version = bare.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const LEGACY: &str = r#"[[versions]]
version = "v0.14.0 (latest)"
url = "/eso-docs/v0.14.0/"
tag = "v0.14.0"
latest = true
release_date = "2025-01-10"
tested_k8s_versions = ["v1.31"]
end_of_life = ""

[[versions]]
version = "v0.13.0"
url = "/eso-docs/v0.13.0/"
tag = "v0.13.0"
latest = false
release_date = "2024-11-02"
tested_k8s_versions = ["v1.30", "v1.31"]
end_of_life = "2025-05-02"
"#;

    #[fixture]
    fn registry() -> VersionRegistry {
        VersionRegistry::from_toml_str(Utf8Path::new("data/eso_versions.toml"), LEGACY)
            .expect("fixture parses")
    }

    fn new_release() -> ReleaseRecord {
        ReleaseRecord::new_latest("eso", "v0.15.0", "2025-03-01", vec!["v1.32".to_owned()])
    }

    #[rstest]
    fn load_strips_legacy_latest_suffix(registry: VersionRegistry) {
        let first = registry.records().first().expect("has records");
        assert_eq!(first.version, "v0.14.0");
        assert_eq!(first.display_version(), "v0.14.0 (latest)");
    }

    #[rstest]
    fn find_latest_returns_flagged_record(registry: VersionRegistry) {
        let (index, record) = registry.find_latest().expect("latest exists");
        assert_eq!(index, 0);
        assert_eq!(record.tag, "v0.14.0");
    }

    #[rstest]
    fn find_latest_prefers_first_of_several() {
        let mut a = new_release();
        a.tag = "v2".to_owned();
        let mut b = new_release();
        b.tag = "v1".to_owned();
        let registry = VersionRegistry::new("r.toml", vec![ReleaseRecord::default(), a, b]);

        let (index, record) = registry.find_latest().expect("latest exists");

        assert_eq!((index, record.tag.as_str()), (1, "v2"));
    }

    #[rstest]
    fn find_latest_without_flag_is_an_error() {
        let registry = VersionRegistry::new("r.toml", vec![ReleaseRecord::default()]);
        let error = registry.find_latest().expect_err("nothing is latest");
        assert!(matches!(error, RegistryError::NoLatest { .. }));
    }

    #[rstest]
    #[case::tag("v0.13.0")]
    #[case::latest_tag("v0.14.0")]
    fn duplicate_tags_are_rejected(registry: VersionRegistry, #[case] tag: &str) {
        let error = registry.assert_no_duplicate(tag).expect_err("duplicate");
        assert!(error.to_string().contains(tag));
    }

    #[rstest]
    fn duplicate_matches_bare_version_field() {
        let record = ReleaseRecord {
            version: "v0.9.0".to_owned(),
            ..ReleaseRecord::default()
        };
        let registry = VersionRegistry::new("r.toml", vec![record]);
        assert!(registry.assert_no_duplicate("v0.9.0").is_err());
    }

    #[rstest]
    fn new_tag_passes_duplicate_check(registry: VersionRegistry) {
        assert!(registry.assert_no_duplicate("v0.15.0").is_ok());
    }

    #[rstest]
    fn promote_leaves_exactly_one_latest_at_front(mut registry: VersionRegistry) {
        let (old, _) = registry.find_latest().expect("latest exists");

        registry.promote(old, new_release());

        let latest: Vec<_> = registry.records().iter().filter(|r| r.latest).collect();
        assert_eq!(latest.len(), 1);
        assert_eq!(registry.records().first(), Some(&new_release()));
        let superseded = registry.records().get(1).expect("old latest kept");
        assert_eq!(superseded.version, "v0.14.0");
        assert!(!superseded.latest);
        assert_eq!(registry.records().len(), 3);
    }

    #[rstest]
    fn save_then_load_is_byte_identical(registry: VersionRegistry) {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("eso_versions.toml"))
            .expect("utf-8 path");
        let bound = VersionRegistry::new(path.clone(), registry.records().to_vec());
        bound.save().expect("first save");
        let first = std::fs::read(&path).expect("read first");

        VersionRegistry::load(&path)
            .expect("reload")
            .save()
            .expect("second save");

        assert_eq!(std::fs::read(&path).expect("read second"), first);
    }

    #[rstest]
    fn saved_document_uses_versions_array(registry: VersionRegistry) {
        let text = registry.to_toml_string().expect("serialises");
        assert!(text.starts_with("[[versions]]\n"));
        assert!(text.contains("version = \"v0.14.0\"\n"));
        assert!(!text.contains("(latest)"));
    }

    #[rstest]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().expect("tempdir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("absent.toml")).expect("utf-8");
        let error = VersionRegistry::load(&path).expect_err("file is absent");
        assert!(matches!(error, RegistryError::NotFound { .. }));
    }

    #[rstest]
    #[case::not_toml("[[versions]\n")]
    #[case::unknown_field("[[versions]]\nversion = \"v1\"\ncolour = \"red\"\n")]
    #[case::wrong_type("[[versions]]\nlatest = \"yes\"\n")]
    fn malformed_registry_is_a_parse_error(#[case] text: &str) {
        let error = VersionRegistry::from_toml_str(Utf8Path::new("r.toml"), text)
            .expect_err("malformed");
        assert!(matches!(error, RegistryError::Parse { .. }));
    }
}

//! The release promotion state machine.
//!
//! A promotion runs in two phases. [`Promoter::plan`] infers tested versions,
//! loads the registry, and validates the request without touching the site.
//! [`Promoter::execute`] then applies the plan step by step, journalling a
//! compensating action after each mutation so that a failure part way
//! through can be undone.

use crate::error::{PromoteError, Result};
use crate::index_patch::patch_latest_link;
use crate::inference::{ManifestFetcher, infer_tested_versions};
use crate::journal::{RollbackReport, UndoAction, UndoJournal};
use crate::landing::render_landing_page;
use crate::layout::{INDEX_FILE, SiteLayout, UNRELEASED_DIR};
use crate::registry::{ReleaseRecord, VersionRegistry, read_registry_text};
use camino::{Utf8Path, Utf8PathBuf};
use docs_release::{ProjectConfig, ReleaseConfig};
use docs_release_common::{CopySummary, copy_tree, replace_file};
use log::{debug, warn};
use std::fmt;
use std::io::Write;

/// Steps of a promotion, in execution order.
///
/// A failure is reported against the stage the run was trying to reach.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Stage {
    /// Nothing has happened yet.
    Start,
    /// Tested Kubernetes versions are known.
    VersionsInferred,
    /// The registry has been read and parsed.
    RegistryLoaded,
    /// The current latest release has been identified.
    LatestFound,
    /// The requested tag is known to be new.
    DuplicateChecked,
    /// The in-memory registry holds the new release.
    RegistryMutated,
    /// The registry file has been replaced.
    RegistrySaved,
    /// The version content directory exists.
    DirectoryCreated,
    /// The unreleased tree has been copied into the version directory.
    ContentPromoted,
    /// The version landing page has been generated.
    LandingPageWritten,
    /// The project index links to the new release.
    IndexPatched,
    /// The promotion is complete.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = match self {
            Self::Start => "starting",
            Self::VersionsInferred => "inferring tested versions",
            Self::RegistryLoaded => "loading the version registry",
            Self::LatestFound => "locating the latest release",
            Self::DuplicateChecked => "checking for duplicate releases",
            Self::RegistryMutated => "updating the registry",
            Self::RegistrySaved => "saving the version registry",
            Self::DirectoryCreated => "creating the version directory",
            Self::ContentPromoted => "promoting content",
            Self::LandingPageWritten => "writing the landing page",
            Self::IndexPatched => "patching the project index",
            Self::Done => "finishing",
        };
        f.write_str(action)
    }
}

/// What the operator asked to release.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PromotionRequest {
    /// Project identifier, for example `eso`.
    pub project: String,
    /// Release tag, for example `v0.15.0`.
    pub tag: String,
    /// Release date in `YYYY-MM-DD` form.
    pub release_date: String,
    /// Tested Kubernetes versions; inferred from upstream when `None` or empty.
    pub tested_versions: Option<Vec<String>>,
}

/// A validated promotion, ready to apply.
#[derive(Clone, Debug)]
pub struct PromotionPlan {
    /// Project identifier.
    pub project: String,
    /// Human-readable project name.
    pub long_name: String,
    /// Tag of the release being superseded.
    pub old_latest: String,
    /// The record that will become latest.
    pub new_record: ReleaseRecord,
    /// Registry file to rewrite.
    pub registry_path: Utf8PathBuf,
    /// Content tree to copy from.
    pub source_dir: Utf8PathBuf,
    /// Content tree to create.
    pub version_dir: Utf8PathBuf,
    /// Root index to patch.
    pub index_path: Utf8PathBuf,
    /// Whether the version directory already existed when planning.
    pub version_dir_exists: bool,
    registry: VersionRegistry,
    old_latest_index: usize,
    registry_text: String,
}

impl PromotionPlan {
    /// Returns the landing page written into the new version.
    #[must_use]
    pub fn landing_page_path(&self) -> Utf8PathBuf {
        self.version_dir.join(INDEX_FILE)
    }
}

/// Summary of a completed promotion.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PromotionReport {
    /// Project identifier.
    pub project: String,
    /// Tag of the superseded release.
    pub old_latest: String,
    /// Tag of the new release.
    pub new_tag: String,
    /// Tested Kubernetes versions recorded for the new release.
    pub tested_versions: Vec<String>,
    /// Entries copied into the version directory.
    pub copied: CopySummary,
    /// Number of latest-version links rewritten in the root index.
    pub index_links: usize,
    /// Files and directories written, in the order they were touched.
    pub updated: Vec<Utf8PathBuf>,
}

/// Drives promotions for one documentation site.
pub struct Promoter<'a> {
    config: &'a ReleaseConfig,
    layout: SiteLayout,
    fetcher: &'a dyn ManifestFetcher,
    rollback: bool,
}

impl<'a> Promoter<'a> {
    /// Creates a promoter for the site at `site_root`.
    #[must_use]
    pub fn new(
        config: &'a ReleaseConfig,
        site_root: &Utf8Path,
        fetcher: &'a dyn ManifestFetcher,
    ) -> Self {
        Self {
            config,
            layout: SiteLayout::new(site_root, config),
            fetcher,
            rollback: true,
        }
    }

    /// Enables or disables the undo journal.
    #[must_use]
    pub const fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Plans and executes a promotion.
    ///
    /// # Errors
    ///
    /// Returns [`PromoteError`] from planning or execution.
    pub fn run(
        &self,
        request: &PromotionRequest,
        progress: &mut dyn Write,
    ) -> Result<PromotionReport> {
        let plan = self.plan(request, progress)?;
        self.execute(plan, progress)
    }

    /// Validates `request` against the site without modifying anything.
    ///
    /// # Errors
    ///
    /// Returns [`PromoteError::Usage`] for an unknown project or a tag that
    /// cannot name a version directory, and [`PromoteError::StepFailed`] when
    /// inference, loading, or validation fails.
    pub fn plan(
        &self,
        request: &PromotionRequest,
        progress: &mut dyn Write,
    ) -> Result<PromotionPlan> {
        let project = self.project(&request.project)?;
        validate_tag(&request.tag)?;

        let tested_versions = match request.tested_versions.as_deref() {
            Some(versions) if !versions.is_empty() => versions.to_vec(),
            _ => {
                let url = project.manifest_url_for(&request.tag);
                progress_line(
                    progress,
                    format!("Inferring tested Kubernetes versions from {url}..."),
                );
                let versions =
                    infer_tested_versions(project, &request.tag, self.fetcher, &self.config.fetch)
                        .map_err(step_failed(Stage::VersionsInferred))?;
                progress_line(
                    progress,
                    format!("Tested Kubernetes versions: {}", versions.join(", ")),
                );
                versions
            }
        };
        advanced(Stage::VersionsInferred);

        let registry_path = self.layout.registry_path(&request.project);
        let registry_text =
            read_registry_text(&registry_path).map_err(step_failed(Stage::RegistryLoaded))?;
        let registry = VersionRegistry::from_toml_str(&registry_path, &registry_text)
            .map_err(step_failed(Stage::RegistryLoaded))?;
        advanced(Stage::RegistryLoaded);

        let (old_latest_index, old_latest) = registry
            .find_latest()
            .map(|(index, record)| (index, record.tag.clone()))
            .map_err(step_failed(Stage::LatestFound))?;
        advanced(Stage::LatestFound);

        registry
            .assert_no_duplicate(&request.tag)
            .map_err(step_failed(Stage::DuplicateChecked))?;
        advanced(Stage::DuplicateChecked);

        let version_dir = self.layout.version_dir(&request.project, &request.tag);
        Ok(PromotionPlan {
            project: request.project.clone(),
            long_name: project.long_name.clone(),
            old_latest,
            new_record: ReleaseRecord::new_latest(
                &request.project,
                &request.tag,
                &request.release_date,
                tested_versions,
            ),
            registry_path,
            source_dir: self.layout.unreleased_dir(&request.project),
            version_dir_exists: version_dir.exists(),
            version_dir,
            index_path: self.layout.index_path(&request.project),
            registry,
            old_latest_index,
            registry_text,
        })
    }

    /// Applies a plan, rolling back completed steps on failure unless
    /// rollback is disabled.
    ///
    /// # Errors
    ///
    /// Returns [`PromoteError::StepFailed`] naming the step that failed.
    pub fn execute(
        &self,
        plan: PromotionPlan,
        progress: &mut dyn Write,
    ) -> Result<PromotionReport> {
        let mut journal = UndoJournal::new();
        match apply(plan, &mut journal, progress) {
            Ok(report) => {
                journal.commit();
                Ok(report)
            }
            Err(err) => {
                if self.rollback {
                    report_rollback(&journal.rollback(), progress);
                } else if !journal.actions().is_empty() {
                    warn!(
                        "rollback disabled; {} step(s) left applied",
                        journal.actions().len()
                    );
                    progress_line(
                        progress,
                        "Rollback disabled; partial changes were left in place.",
                    );
                }
                Err(err)
            }
        }
    }

    fn project(&self, id: &str) -> Result<&'a ProjectConfig> {
        self.config.project(id).ok_or_else(|| {
            let known: Vec<_> = self.config.project_ids().collect();
            PromoteError::usage(format!(
                "unknown project {id}; expected one of: {}",
                known.join(", ")
            ))
        })
    }
}

fn apply(
    plan: PromotionPlan,
    journal: &mut UndoJournal,
    progress: &mut dyn Write,
) -> Result<PromotionReport> {
    let PromotionPlan {
        project,
        long_name,
        old_latest,
        new_record,
        registry_path,
        source_dir,
        version_dir,
        index_path,
        version_dir_exists,
        mut registry,
        old_latest_index,
        registry_text,
    } = plan;
    let new_tag = new_record.tag.clone();
    let tested_versions = new_record.tested_k8s_versions.clone();
    let mut updated = Vec::new();

    registry.promote(old_latest_index, new_record);
    advanced(Stage::RegistryMutated);

    progress_line(progress, format!("Updating {registry_path}..."));
    registry.save().map_err(step_failed(Stage::RegistrySaved))?;
    journal.record(UndoAction::RestoreFile {
        path: registry_path.clone(),
        contents: registry_text.into_bytes(),
    });
    updated.push(registry_path);
    advanced(Stage::RegistrySaved);

    if !version_dir_exists {
        create_version_dir(&version_dir, &source_dir).map_err(|source| PromoteError::StepFailed {
            stage: Stage::DirectoryCreated,
            source: Box::new(PromoteError::CreateDir {
                path: version_dir.clone(),
                source,
            }),
        })?;
        journal.record(UndoAction::RemoveDirectory {
            path: version_dir.clone(),
        });
    }
    advanced(Stage::DirectoryCreated);

    progress_line(progress, format!("Copying {source_dir} to {version_dir}..."));
    let copied = copy_tree(source_dir.as_std_path(), version_dir.as_std_path())
        .map_err(step_failed(Stage::ContentPromoted))?;
    debug!("copied {copied}");
    updated.push(version_dir.clone());
    advanced(Stage::ContentPromoted);

    let landing_page = version_dir.join(INDEX_FILE);
    let page = render_landing_page(&long_name, &new_tag, &project);
    replace_file(landing_page.as_std_path(), page.as_bytes())
        .map_err(step_failed(Stage::LandingPageWritten))?;
    updated.push(landing_page);
    advanced(Stage::LandingPageWritten);

    progress_line(progress, format!("Updating {index_path}..."));
    let outcome = patch_latest_link(&index_path, &project, &new_tag)
        .map_err(step_failed(Stage::IndexPatched))?;
    journal.record(UndoAction::RestoreFile {
        path: index_path.clone(),
        contents: outcome.original.into_bytes(),
    });
    updated.push(index_path);
    advanced(Stage::IndexPatched);

    advanced(Stage::Done);
    Ok(PromotionReport {
        project,
        old_latest,
        new_tag,
        tested_versions,
        copied,
        index_links: outcome.replacements,
        updated,
    })
}

/// Rejects tags that would not name a sibling of the unreleased tree.
fn validate_tag(tag: &str) -> Result<()> {
    let reason = if tag == UNRELEASED_DIR {
        "names the unreleased content tree"
    } else if tag == "." || tag == ".." {
        "is a relative path component"
    } else if tag.contains(['/', '\\']) {
        "contains a path separator"
    } else {
        return Ok(());
    };
    Err(PromoteError::usage(format!("release tag {tag:?} {reason}")))
}

/// Creates the version directory with the unreleased tree's permission bits.
///
/// A missing source is left for the copy step to report.
fn create_version_dir(version_dir: &Utf8Path, source_dir: &Utf8Path) -> std::io::Result<()> {
    std::fs::create_dir_all(version_dir)?;
    match std::fs::metadata(source_dir) {
        Ok(source) => std::fs::set_permissions(version_dir, source.permissions()),
        Err(_) => Ok(()),
    }
}

fn step_failed<E>(stage: Stage) -> impl FnOnce(E) -> PromoteError
where
    E: Into<PromoteError>,
{
    move |err| PromoteError::StepFailed {
        stage,
        source: Box::new(err.into()),
    }
}

fn advanced(stage: Stage) {
    debug!("stage reached: {stage:?}");
}

fn report_rollback(report: &RollbackReport, progress: &mut dyn Write) {
    for action in &report.undone {
        progress_line(progress, format!("Rolled back: {action}"));
    }
    for failure in &report.failures {
        progress_line(
            progress,
            format!("Rollback could not {}: {}", failure.action, failure.error),
        );
    }
}

fn progress_line(progress: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(progress, "{message}").is_err() {
        // Progress output is advisory.
    }
}

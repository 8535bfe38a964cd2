//! Locations of the files a promotion reads and writes.

use camino::{Utf8Path, Utf8PathBuf};
use docs_release::ReleaseConfig;

/// Name of the content tree promoted into each new version.
pub const UNRELEASED_DIR: &str = "unreleased";

/// Name of the index page in each content directory.
pub const INDEX_FILE: &str = "_index.md";

/// Resolves per-project paths under a documentation site.
///
/// # Examples
///
/// ```
/// use camino::Utf8Path;
/// use docs_release::ReleaseConfig;
/// use docs_release_promoter::layout::SiteLayout;
///
/// let layout = SiteLayout::new(Utf8Path::new("site"), &ReleaseConfig::default());
/// assert_eq!(layout.registry_path("eso"), "site/data/eso_versions.toml");
/// assert_eq!(layout.version_dir("eso", "v0.15.0"), "site/content/en/eso-docs/v0.15.0");
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SiteLayout {
    content_root: Utf8PathBuf,
    data_dir: Utf8PathBuf,
}

impl SiteLayout {
    /// Anchors the configured content and data directories at `site_root`.
    #[must_use]
    pub fn new(site_root: &Utf8Path, config: &ReleaseConfig) -> Self {
        Self {
            content_root: site_root.join(&config.content_root),
            data_dir: site_root.join(&config.data_dir),
        }
    }

    /// `<content_root>/<project>-docs`
    #[must_use]
    pub fn project_dir(&self, project: &str) -> Utf8PathBuf {
        self.content_root.join(format!("{project}-docs"))
    }

    /// `<data_dir>/<project>_versions.toml`
    #[must_use]
    pub fn registry_path(&self, project: &str) -> Utf8PathBuf {
        self.data_dir.join(format!("{project}_versions.toml"))
    }

    /// The project's root index page.
    #[must_use]
    pub fn index_path(&self, project: &str) -> Utf8PathBuf {
        self.project_dir(project).join(INDEX_FILE)
    }

    /// The content tree that becomes the next release.
    #[must_use]
    pub fn unreleased_dir(&self, project: &str) -> Utf8PathBuf {
        self.project_dir(project).join(UNRELEASED_DIR)
    }

    /// The content tree for a released `tag`.
    #[must_use]
    pub fn version_dir(&self, project: &str, tag: &str) -> Utf8PathBuf {
        self.project_dir(project).join(tag)
    }
}

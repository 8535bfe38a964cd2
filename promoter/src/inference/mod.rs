//! Inference of the Kubernetes versions a release was tested against.
//!
//! The release's `go.mod` is fetched from the upstream repository at the
//! release tag, the Kubernetes client library requirement is read from it,
//! and the library version is mapped to the platform version it tracks.

mod fetch;
mod manifest;
mod platform;

pub use fetch::{FetchError, HttpFetcher, ManifestFetcher, fetch_with_retry};
pub use manifest::parse_dependency_version;
pub use platform::to_platform_version;

#[cfg(test)]
pub use fetch::MockManifestFetcher;

use docs_release::{FetchPolicy, ProjectConfig};
use log::debug;
use thiserror::Error;

/// Errors raised while inferring tested versions.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The upstream manifest could not be retrieved.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The manifest does not require the dependency module.
    #[error("could not find {module} version in {url}")]
    DependencyNotFound {
        /// The module path that was searched for.
        module: String,
        /// The manifest URL that was inspected.
        url: String,
    },
}

/// Infers the tested Kubernetes versions for `tag` of `project`.
///
/// The result currently holds exactly one version, derived from the
/// project's dependency requirement at that tag.
///
/// # Errors
///
/// Returns [`InferenceError::Fetch`] when the manifest cannot be retrieved
/// within the fetch policy, and [`InferenceError::DependencyNotFound`] when
/// it does not mention the dependency.
pub fn infer_tested_versions(
    project: &ProjectConfig,
    tag: &str,
    fetcher: &dyn ManifestFetcher,
    policy: &FetchPolicy,
) -> Result<Vec<String>, InferenceError> {
    let url = project.manifest_url_for(tag);
    let manifest = fetch_with_retry(fetcher, &url, policy)?;
    let dependency_version =
        parse_dependency_version(&manifest, &project.dependency).ok_or_else(|| {
            InferenceError::DependencyNotFound {
                module: project.dependency.clone(),
                url: url.clone(),
            }
        })?;
    let platform_version = to_platform_version(dependency_version);
    debug!("{} {dependency_version} maps to {platform_version}", project.dependency);
    Ok(vec![platform_version])
}

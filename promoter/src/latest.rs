//! Latest command implementation.
//!
//! Reports the current latest release of every configured project, which is
//! the runtime configuration the site's search layer filters on.

use crate::cli::LatestArgs;
use crate::error::{PromoteError, Result};
use crate::layout::SiteLayout;
use crate::output::{format_latest_human, format_latest_json};
use crate::registry::{RegistryError, VersionRegistry};
use docs_release::ReleaseConfig;
use log::warn;
use std::collections::BTreeMap;
use std::io::Write;

/// Prints the latest release of each project.
///
/// Output is written to stdout (human-readable by default, JSON with
/// `--json`).
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, a registry is
/// unreadable or malformed, or writing to stdout fails.
pub fn run_latest(args: &LatestArgs, stdout: &mut dyn Write) -> Result<()> {
    let config = ReleaseConfig::load(&args.site_root, args.config.as_deref())?;
    let layout = SiteLayout::new(&args.site_root, &config);
    let latest = latest_releases(&config, &layout)?;

    let output = if args.json {
        format_latest_json(&latest)?
    } else {
        format_latest_human(&latest)
    };

    writeln!(stdout, "{output}").map_err(|source| PromoteError::Output { source })?;
    Ok(())
}

/// Collects the latest tag of every project with a registry.
///
/// Projects without a registry file or without a latest release are skipped
/// with a warning.
///
/// # Errors
///
/// Returns [`PromoteError::Registry`] when a registry exists but cannot be
/// read or parsed.
pub fn latest_releases(
    config: &ReleaseConfig,
    layout: &SiteLayout,
) -> Result<BTreeMap<String, String>> {
    let mut latest = BTreeMap::new();
    for project in config.project_ids() {
        let registry = match VersionRegistry::load(&layout.registry_path(project)) {
            Ok(registry) => registry,
            Err(RegistryError::NotFound { path }) => {
                warn!("skipping {project}: no registry at {path}");
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        match registry.find_latest() {
            Ok((_, record)) => {
                latest.insert(project.to_owned(), record.tag.clone());
            }
            Err(err) => warn!("skipping {project}: {err}"),
        }
    }
    Ok(latest)
}

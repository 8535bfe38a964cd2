//! CLI argument definitions for the documentation release tool.
//!
//! This module defines the command-line interface using clap and converts
//! parsed arguments into a [`PromotionRequest`]. It is separated from the
//! main entrypoint to keep the binary focused on orchestration.

use crate::error::{PromoteError, Result};
use crate::pipeline::PromotionRequest;
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Format accepted for `--release-date`.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Promote unreleased documentation to a versioned release.
#[derive(Parser, Debug)]
#[command(name = "docs-release")]
#[command(about, args_conflicts_with_subcommands = true)]
#[command(long_about = concat!(
    "Promote unreleased documentation to a versioned release.\n\n",
    "Copies content/en/<project>-docs/unreleased into a directory named after ",
    "the release tag, records the release in data/<project>_versions.toml, ",
    "writes the version landing page, and points the project's latest-version ",
    "link at the new release.\n\n",
    "When --tested-k8s-versions is omitted, the Kubernetes version is inferred ",
    "from the k8s.io/client-go requirement in the release's upstream go.mod.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Release External Secrets Operator v0.15.0:\n",
    "    $ docs-release --project eso --version v0.15.0\n\n",
    "  Record tested versions explicitly:\n",
    "    $ docs-release --project reloader --version v1.2.0 \\\n",
    "        --tested-k8s-versions v1.31,v1.32\n\n",
    "  Preview without touching the site:\n",
    "    $ docs-release --project eso --version v0.15.0 --dry-run\n\n",
    "  Show the current latest release of every project:\n",
    "    $ docs-release latest --json",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Promotion arguments (used when no subcommand is given).
    #[command(flatten)]
    pub promote: PromoteArgs,
}

impl Cli {
    /// Returns the `-v` count of whichever command will run.
    #[must_use]
    pub fn verbosity(&self) -> u8 {
        match &self.command {
            Some(Command::Promote(args)) => args.verbosity,
            Some(Command::Latest(args)) => args.verbosity,
            None => self.promote.verbosity,
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Promote a release (default when no subcommand is given).
    Promote(PromoteArgs),

    /// Show the latest release of each project.
    Latest(LatestArgs),
}

/// Arguments for the promote command.
#[derive(Parser, Debug, Clone, Default)]
pub struct PromoteArgs {
    /// Project to release (for example eso or reloader).
    #[arg(short, long, value_name = "ID")]
    pub project: Option<String>,

    /// Release tag, for example v0.15.0.
    #[arg(long = "version", value_name = "TAG")]
    pub version: Option<String>,

    /// Release date in YYYY-MM-DD form [default: today].
    #[arg(long, value_name = "DATE")]
    pub release_date: Option<String>,

    /// Comma-separated Kubernetes versions the release was tested against.
    #[arg(long, value_name = "VERSIONS")]
    pub tested_k8s_versions: Option<String>,

    /// Root of the documentation site.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub site_root: Utf8PathBuf,

    /// Configuration file [default: <site-root>/docs-release.toml].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Show the planned changes and exit without modifying anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Leave completed steps in place when a later step fails.
    #[arg(long)]
    pub no_rollback: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl PromoteArgs {
    /// Builds the promotion request, defaulting the release date to `today`.
    ///
    /// # Errors
    ///
    /// Returns [`PromoteError::Usage`] when the project or version is
    /// missing or the release date is malformed.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use docs_release_promoter::cli::PromoteArgs;
    ///
    /// let args = PromoteArgs {
    ///     project: Some("eso".to_owned()),
    ///     version: Some("v0.15.0".to_owned()),
    ///     ..PromoteArgs::default()
    /// };
    /// let today = NaiveDate::from_ymd_opt(2025, 3, 1).expect("valid date");
    /// let request = args.to_request(today).expect("complete arguments");
    /// assert_eq!(request.release_date, "2025-03-01");
    /// assert_eq!(request.tested_versions, None);
    /// ```
    pub fn to_request(&self, today: NaiveDate) -> Result<PromotionRequest> {
        let project = required(self.project.as_deref(), "--project")?;
        let tag = required(self.version.as_deref(), "--version")?;
        let release_date = match self.release_date.as_deref() {
            Some(date) => validate_release_date(date)?,
            None => today.format(RELEASE_DATE_FORMAT).to_string(),
        };
        Ok(PromotionRequest {
            project,
            tag,
            release_date,
            tested_versions: self
                .tested_k8s_versions
                .as_deref()
                .map(split_version_list),
        })
    }
}

/// Arguments for the latest command.
#[derive(Parser, Debug, Clone, Default)]
pub struct LatestArgs {
    /// Root of the documentation site.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub site_root: Utf8PathBuf,

    /// Configuration file [default: <site-root>/docs-release.toml].
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Output in JSON format.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(short, long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

/// Splits a comma-separated version list, dropping blank entries.
///
/// # Example
///
/// ```
/// use docs_release_promoter::cli::split_version_list;
///
/// assert_eq!(split_version_list(" v1.31, ,v1.32 "), vec!["v1.31", "v1.32"]);
/// ```
#[must_use]
pub fn split_version_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_owned)
        .collect()
}

fn required(value: Option<&str>, flag: &str) -> Result<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| PromoteError::usage(format!("{flag} is required")))
}

fn validate_release_date(date: &str) -> Result<String> {
    NaiveDate::parse_from_str(date, RELEASE_DATE_FORMAT)
        .map(|parsed| parsed.format(RELEASE_DATE_FORMAT).to_string())
        .map_err(|err| {
            PromoteError::usage(format!(
                "--release-date must be YYYY-MM-DD, got {date:?}: {err}"
            ))
        })
}

//! Output formatting for the release CLI.
//!
//! Human-readable summaries go to stderr alongside progress lines; the
//! `latest` listing can also be rendered as JSON for the site's search
//! configuration.

use crate::error::Result;
use crate::pipeline::{PromotionPlan, PromotionReport};
use std::collections::BTreeMap;

/// Format the closing message after a successful promotion.
///
/// # Example
///
/// ```
/// use docs_release_common::CopySummary;
/// use docs_release_promoter::output::success_message;
/// use docs_release_promoter::pipeline::PromotionReport;
///
/// let report = PromotionReport {
///     project: "eso".to_owned(),
///     old_latest: "v0.14.0".to_owned(),
///     new_tag: "v0.15.0".to_owned(),
///     tested_versions: vec!["v1.32".to_owned()],
///     copied: CopySummary::default(),
///     index_links: 1,
///     updated: Vec::new(),
/// };
/// assert!(success_message(&report).starts_with("Release v0.15.0 prepared successfully!"));
/// ```
#[must_use]
pub fn success_message(report: &PromotionReport) -> String {
    let mut output = format!("Release {} prepared successfully!\n\n", report.new_tag);
    output.push_str(&format!("  Project:            {}\n", report.project));
    output.push_str(&format!("  Previous latest:    {}\n", report.old_latest));
    output.push_str(&format!("  New latest:         {}\n", report.new_tag));
    output.push_str(&format!(
        "  Tested Kubernetes:  {}\n",
        report.tested_versions.join(", ")
    ));
    output.push_str(&format!("  Content copied:     {}\n", report.copied));
    output.push_str(&format!("  Index links:        {}\n", report.index_links));
    output.push_str("\nUpdated:\n");
    for path in &report.updated {
        output.push_str(&format!("  - {path}\n"));
    }
    output.push_str(concat!(
        "\nNext steps:\n",
        "  1. Review the changes\n",
        "  2. Commit and push",
    ));
    output
}

/// Format the planned mutations for `--dry-run`.
#[must_use]
pub fn dry_run_text(plan: &PromotionPlan) -> String {
    let record = &plan.new_record;
    let verb = if plan.version_dir_exists {
        "refresh"
    } else {
        "create"
    };
    let mut output = String::from("Dry run - no files will be modified\n\n");
    output.push_str(&format!("Project: {} ({})\n", plan.long_name, plan.project));
    output.push_str(&format!("Current latest: {}\n", plan.old_latest));
    output.push_str(&format!("New release: {}\n", record.display_version()));
    output.push_str(&format!("  url: {}\n", record.url));
    output.push_str(&format!("  release date: {}\n", record.release_date));
    output.push_str(&format!(
        "  tested Kubernetes versions: {}\n",
        record.tested_k8s_versions.join(", ")
    ));
    output.push_str("\nPlanned changes:\n");
    output.push_str(&format!("  - update {}\n", plan.registry_path));
    output.push_str(&format!(
        "  - {verb} {} from {}\n",
        plan.version_dir, plan.source_dir
    ));
    output.push_str(&format!("  - write {}\n", plan.landing_page_path()));
    output.push_str(&format!(
        "  - point the latest-version link in {} at {}",
        plan.index_path, record.tag
    ));
    output
}

/// Format the latest release of each project for people.
#[must_use]
pub fn format_latest_human(latest: &BTreeMap<String, String>) -> String {
    if latest.is_empty() {
        return String::from("No released versions found.");
    }
    let width = latest.keys().map(String::len).max().unwrap_or_default();
    let mut output = String::from("Latest releases:\n");
    for (project, tag) in latest {
        output.push_str(&format!("\n  {project:<width$}  {tag}"));
    }
    output
}

/// Format the latest release of each project as a JSON object.
///
/// # Errors
///
/// Returns [`crate::error::PromoteError::Json`] if serialisation fails.
pub fn format_latest_json(latest: &BTreeMap<String, String>) -> Result<String> {
    Ok(serde_json::to_string_pretty(latest)?)
}

//! Landing page for a newly promoted documentation version.

/// Renders the `_index.md` placed at the root of a versioned content tree.
///
/// The front matter names the page after the project and tag and cascades
/// the project identifiers to every child page.
///
/// # Examples
///
/// ```
/// use docs_release_promoter::landing::render_landing_page;
///
/// let page = render_landing_page("Reloader Operator", "v1.2.0", "reloader");
/// assert!(page.starts_with("+++\ntitle = \"Reloader Operator v1.2.0 Documentation\"\n"));
/// ```
#[must_use]
pub fn render_landing_page(long_name: &str, tag: &str, project: &str) -> String {
    format!(
        concat!(
            "+++\n",
            "title = \"{long_name} {tag} Documentation\"\n",
            "linkTitle = \"{tag}\"\n",
            "weight = 1\n",
            "\n",
            "[[cascade]]\n",
            "type = \"docs\"\n",
            "\n",
            "  [cascade.params]\n",
            "  project = \"{project}\"\n",
            "  project_version = \"{tag}\"\n",
            "  sidebar_root_for = \"children\"\n",
            "+++\n",
            "\n",
            "Welcome to the {long_name} {tag} documentation.\n",
        ),
        long_name = long_name,
        tag = tag,
        project = project,
    )
}

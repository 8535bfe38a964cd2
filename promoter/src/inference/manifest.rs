//! Dependency lookup in Go module manifests.

/// Returns the version a `go.mod` document requires for `module`.
///
/// Lines are trimmed and scanned in order. A line matches when its first
/// whitespace-separated field is exactly `module`, or when it is a
/// single-line `require <module> <version>` directive. Replace directives
/// (`<module> => ...`) never match. The first match wins.
///
/// # Examples
///
/// ```
/// use docs_release_promoter::inference::parse_dependency_version;
///
/// let manifest = "module example\n\nrequire (\n\tk8s.io/client-go v0.35.0\n)\n";
/// assert_eq!(
///     parse_dependency_version(manifest, "k8s.io/client-go"),
///     Some("v0.35.0")
/// );
/// ```
#[must_use]
pub fn parse_dependency_version<'a>(manifest: &'a str, module: &str) -> Option<&'a str> {
    manifest
        .lines()
        .map(str::trim)
        .find_map(|line| version_on_line(line, module))
}

fn version_on_line<'a>(line: &'a str, module: &str) -> Option<&'a str> {
    let mut fields = line.split_whitespace();
    let mut first = fields.next()?;
    if first == "require" {
        first = fields.next()?;
    }
    if first != module {
        return None;
    }
    fields.next().filter(|version| *version != "=>")
}

//! Conversion from `client-go` versions to Kubernetes release versions.
//!
//! The Kubernetes client libraries are published as `v0.<minor>.<patch>`
//! while the platform itself is `v1.<minor>`. Anything that does not look
//! like a `v0` semantic version passes through untouched.

/// Maps a dependency version to the Kubernetes version it tracks.
///
/// A leading `v` is optional. Inputs that are not a valid semantic version
/// prefix (`vMAJOR`, `vMAJOR.MINOR` or `vMAJOR.MINOR.PATCH[-pre][+build]`),
/// or whose major component is not zero, are returned unchanged. The patch
/// component is dropped and a missing minor component reads as zero.
///
/// # Examples
///
/// ```
/// use docs_release_promoter::inference::to_platform_version;
///
/// assert_eq!(to_platform_version("v0.35.2"), "v1.35");
/// assert_eq!(to_platform_version("v1.35.0"), "v1.35.0");
/// assert_eq!(to_platform_version("main"), "main");
/// ```
#[must_use]
pub fn to_platform_version(version: &str) -> String {
    let bare = version.strip_prefix('v').unwrap_or(version);
    match parse_prefix(bare) {
        Some(SemverPrefix { major: "0", minor }) => format!("v1.{}", minor.unwrap_or("0")),
        _ => version.to_owned(),
    }
}

struct SemverPrefix<'a> {
    major: &'a str,
    minor: Option<&'a str>,
}

/// Parses `MAJOR[.MINOR[.PATCH[-pre][+build]]]` without the leading `v`.
fn parse_prefix(bare: &str) -> Option<SemverPrefix<'_>> {
    let (core, build) = match bare.split_once('+') {
        Some((core, build)) => (core, Some(build)),
        None => (bare, None),
    };
    let (core, pre) = match core.split_once('-') {
        Some((core, pre)) => (core, Some(pre)),
        None => (core, None),
    };

    let mut parts = core.split('.');
    let major = parts.next().filter(|part| is_numeric_identifier(part))?;
    let minor = parts.next();
    let patch = parts.next();
    if parts.next().is_some() {
        return None;
    }
    if minor.is_some_and(|part| !is_numeric_identifier(part))
        || patch.is_some_and(|part| !is_numeric_identifier(part))
    {
        return None;
    }
    if patch.is_none() && (pre.is_some() || build.is_some()) {
        return None;
    }
    if pre.is_some_and(|pre| !pre.split('.').all(is_prerelease_identifier))
        || build.is_some_and(|build| !build.split('.').all(is_build_identifier))
    {
        return None;
    }

    Some(SemverPrefix { major, minor })
}

fn is_numeric_identifier(part: &str) -> bool {
    !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'))
}

fn is_build_identifier(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
}

fn is_prerelease_identifier(part: &str) -> bool {
    if !is_build_identifier(part) {
        return false;
    }
    !part.bytes().all(|b| b.is_ascii_digit()) || is_numeric_identifier(part)
}

/// Path utilities: mount-path merging, segment keys and request-path cleanup
///
/// All functions are **pure**: given same input, always produce same output with no side effects.

use std::borrow::Cow;

pub mod hierarchy;
pub use hierarchy::{pattern_to_segments, SegmentKeys};

/// Joins a mount path and a route pattern
///
/// - a trailing `*` (and the `/` before it) is stripped from `base`
/// - `base == "/"` counts as no base
/// - `path == "*"` is the mount point itself when mounting, else `/*`
/// - `path == "/"` under a non-empty base adds nothing
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::merge_path;
///
/// assert_eq!(merge_path("/api", "/users", false), "/api/users");
/// assert_eq!(merge_path("/api/*", "/users", false), "/api/users");
/// assert_eq!(merge_path("/api", "/", false), "/api");
/// assert_eq!(merge_path("/", "/users", false), "/users");
/// assert_eq!(merge_path("/api", "*", true), "/api");
/// assert_eq!(merge_path("/api", "*", false), "/api/*");
/// ```
pub fn merge_path(base: &str, path: &str, is_mounting: bool) -> String {
    let base = match base.strip_suffix('*') {
        Some(stripped) => stripped.strip_suffix('/').unwrap_or(stripped),
        None => base,
    };
    let base = if base == "/" { "" } else { base };

    let path = match path {
        "*" if is_mounting => "",
        "*" => "/*",
        "/" if !base.is_empty() => "",
        other => other,
    };

    format!("{}{}", base, path)
}

/// Maps an empty merged path to the catch-everything pattern `*`
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::to_route_path;
///
/// assert_eq!(to_route_path(""), "*");
/// assert_eq!(to_route_path("/about"), "/about");
/// ```
pub fn to_route_path(path: impl Into<String>) -> String {
    let path = path.into();
    if path.is_empty() {
        "*".to_string()
    } else {
        path
    }
}

/// Validates if a request path is in canonical form
///
/// **Pure function**: No side effects, deterministic output.
///
/// # Rules
///
/// - Must start with `/`
/// - Must not contain `//` or `\`
/// - Must not end with `/` (except root `/`)
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::is_valid_path;
///
/// assert!(is_valid_path("/"));
/// assert!(is_valid_path("/users/123"));
///
/// assert!(!is_valid_path(""));
/// assert!(!is_valid_path("/about/"));
/// assert!(!is_valid_path("/about//page"));
/// ```
pub fn is_valid_path(path: &str) -> bool {
    if !path.starts_with('/') {
        return false;
    }

    if path.contains("//") || path.contains('\\') {
        return false;
    }

    path == "/" || !path.ends_with('/')
}

/// Normalizes a request path to canonical form
///
/// Returns `Cow::Borrowed` when the input is already canonical.
///
/// - Trailing slashes: `/path/` → `/path`
/// - Double slashes: `/path//to` → `/path/to`
/// - Backslashes: `\path\to` → `/path/to`
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::normalize_path;
/// use std::borrow::Cow;
///
/// assert!(matches!(normalize_path("/about"), Cow::Borrowed("/about")));
/// assert_eq!(normalize_path("/about/"), "/about");
/// assert_eq!(normalize_path("\\users\\123"), "/users/123");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> Cow<'_, str> {
    if is_valid_path(path) {
        return Cow::Borrowed(path);
    }

    let normalized = path
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        Cow::Borrowed("/")
    } else {
        Cow::Owned(format!("/{}", normalized))
    }
}

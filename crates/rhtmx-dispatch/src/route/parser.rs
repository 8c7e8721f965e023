/// Route specifier parsing and priority calculation
///
/// Pure functional parsers that turn file-system route specifiers
/// (`blog/[slug]`, `docs/[...rest]`, `(marketing)/about`) into path templates.
/// All functions are **pure**: same input → same output, no side effects.

use std::cmp::Ordering;

use crate::error::PatternError;

/// Converts a route specifier into a path template
///
/// Segments are compiled left to right:
///
/// - `[name]` → `:name`
/// - `[...name]` → `:name*` (catch-all, whole segment only)
/// - `[[name]]` → `{/:name}?` (optional, whole segment only)
/// - `(group)` → dropped, unless `keep_groups` is set
/// - a trailing `index` segment maps to its parent path
///
/// # Errors
///
/// Fails with a [`PatternError`] naming `path` when two parameters touch
/// (`[id][bar]`), an optional parameter shares its segment with other text
/// (`foo-[[bar]]`), or brackets do not balance.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::parser::path_to_pattern;
///
/// assert_eq!(path_to_pattern("foo/index", false).unwrap(), "/foo");
/// assert_eq!(path_to_pattern("index", false).unwrap(), "/");
/// assert_eq!(path_to_pattern("users/[id]", false).unwrap(), "/users/:id");
/// assert_eq!(path_to_pattern("docs/[...rest]", false).unwrap(), "/docs/:rest*");
/// assert_eq!(path_to_pattern("foo/[[id]]", false).unwrap(), "/foo{/:id}?");
/// assert_eq!(path_to_pattern("(shop)/cart", false).unwrap(), "/cart");
/// assert_eq!(path_to_pattern("(shop)/cart", true).unwrap(), "/(shop)/cart");
/// assert!(path_to_pattern("[id][bar]", false).is_err());
/// ```
pub fn path_to_pattern(path: &str, keep_groups: bool) -> Result<String, PatternError> {
    let mut parts: Vec<&str> = path.split('/').collect();

    if parts.last() == Some(&"index") {
        if parts.len() == 1 {
            return Ok("/".to_string());
        }
        parts.pop();
    }

    let mut route = String::new();

    for part in parts {
        if let Some(name) = part
            .strip_prefix("[...")
            .and_then(|rest| rest.strip_suffix(']'))
        {
            route.push_str("/:");
            route.push_str(name);
            route.push('*');
            continue;
        }

        if !keep_groups && is_route_group(part) {
            continue;
        }

        if part.contains("][") {
            return Err(PatternError::AdjacentParams {
                path: path.to_string(),
            });
        }

        let (compiled, optional) = compile_segment(part, path)?;
        if !optional {
            route.push('/');
        }
        route.push_str(&compiled);
    }

    if route.is_empty() {
        route.push('/');
    }

    Ok(route)
}

/// Compiles the bracket syntax inside one segment
///
/// Returns the compiled text and whether it is an optional segment (which
/// carries its own leading `/`).
fn compile_segment(part: &str, path: &str) -> Result<(String, bool), PatternError> {
    let chars: Vec<char> = part.chars().collect();
    let mut out = String::with_capacity(part.len() + 4);
    let mut depth: i32 = 0;
    let mut optional = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '[' => {
                if chars.get(i + 1) == Some(&'[') {
                    // `[[` must open the segment
                    if i > 0 && chars[i - 1] != '/' {
                        return Err(PatternError::OptionalNotFullSegment {
                            path: path.to_string(),
                        });
                    }
                    depth += 1;
                    optional = true;
                    out.push_str("{/");
                    i += 1;
                }
                out.push(':');
                depth += 1;
            }
            ']' => {
                if chars.get(i + 1) == Some(&']') {
                    // `]]` must close the segment
                    if chars.get(i + 2).is_some_and(|&c| c != '/') {
                        return Err(PatternError::OptionalNotFullSegment {
                            path: path.to_string(),
                        });
                    }
                    depth -= 1;
                    out.push_str("}?");
                    i += 1;
                }
                depth -= 1;
                if depth < 0 {
                    return Err(PatternError::UnbalancedBrackets {
                        path: path.to_string(),
                    });
                }
            }
            c => out.push(c),
        }
        i += 1;
    }

    Ok((out, optional))
}

/// Checks whether a segment is a route group like `(marketing)`
///
/// Pure predicate function: segment -> bool
pub fn is_route_group(segment: &str) -> bool {
    segment.len() >= 2 && segment.starts_with('(') && segment.ends_with(')')
}

/// Specificity of one specifier segment (lower sorts first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum SegmentRank {
    Static,
    Dynamic,
    Optional,
    CatchAll,
}

fn rank_segment(segment: &str) -> SegmentRank {
    if segment.starts_with("[...") {
        SegmentRank::CatchAll
    } else if segment.starts_with("[[") {
        SegmentRank::Optional
    } else if segment.contains('[') {
        SegmentRank::Dynamic
    } else {
        SegmentRank::Static
    }
}

/// Orders two route specifiers so more specific routes register first
///
/// Segments are compared pairwise, skipping route groups: static text beats a
/// parameter, a parameter beats an optional parameter, and everything beats a
/// catch-all. Ties fall back to the shorter path, then to plain text order.
///
/// Dynamic routes match first-registered-wins, so registration order decides
/// between `/blog/[slug]` and `/blog/[...rest]`.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::parser::compare_route_paths;
/// use std::cmp::Ordering;
///
/// assert_eq!(compare_route_paths("blog/new", "blog/[slug]"), Ordering::Less);
/// assert_eq!(compare_route_paths("blog/[...rest]", "blog/[slug]"), Ordering::Greater);
/// assert_eq!(compare_route_paths("(a)/blog/new", "blog/[slug]"), Ordering::Less);
/// ```
pub fn compare_route_paths(a: &str, b: &str) -> Ordering {
    let a_segments: Vec<&str> = a
        .split('/')
        .filter(|s| !s.is_empty() && !is_route_group(s))
        .collect();
    let b_segments: Vec<&str> = b
        .split('/')
        .filter(|s| !s.is_empty() && !is_route_group(s))
        .collect();

    a_segments
        .iter()
        .zip(b_segments.iter())
        .map(|(x, y)| rank_segment(x).cmp(&rank_segment(y)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or_else(|| {
            a_segments
                .len()
                .cmp(&b_segments.len())
                .then_with(|| a.cmp(b))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_to_pattern_static() {
        assert_eq!(path_to_pattern("about", false).unwrap(), "/about");
        assert_eq!(path_to_pattern("a/b/c", false).unwrap(), "/a/b/c");
    }

    #[test]
    fn test_path_to_pattern_index() {
        assert_eq!(path_to_pattern("index", false).unwrap(), "/");
        assert_eq!(path_to_pattern("foo/index", false).unwrap(), "/foo");
    }

    #[test]
    fn test_path_to_pattern_dynamic() {
        assert_eq!(path_to_pattern("users/[id]", false).unwrap(), "/users/:id");
        assert_eq!(
            path_to_pattern("[id]-asdf[bar]", false).unwrap(),
            "/:id-asdf:bar"
        );
        assert_eq!(path_to_pattern("asdf[bar]", false).unwrap(), "/asdf:bar");
    }

    #[test]
    fn test_path_to_pattern_catch_all() {
        assert_eq!(
            path_to_pattern("docs/[...slug]", false).unwrap(),
            "/docs/:slug*"
        );
    }

    #[test]
    fn test_path_to_pattern_optional() {
        assert_eq!(path_to_pattern("foo/[[id]]", false).unwrap(), "/foo{/:id}?");
        assert_eq!(
            path_to_pattern("foo/[[id]]/bar", false).unwrap(),
            "/foo{/:id}?/bar"
        );
    }

    #[test]
    fn test_path_to_pattern_groups() {
        assert_eq!(path_to_pattern("(admin)/users", false).unwrap(), "/users");
        assert_eq!(path_to_pattern("(admin)", false).unwrap(), "/");
        assert_eq!(path_to_pattern("(a)/(b)/index", false).unwrap(), "/");
        assert_eq!(
            path_to_pattern("(admin)/users", true).unwrap(),
            "/(admin)/users"
        );
    }

    #[test]
    fn test_path_to_pattern_rejects_adjacent_params() {
        assert_eq!(
            path_to_pattern("[id][bar]", false),
            Err(PatternError::AdjacentParams {
                path: "[id][bar]".to_string()
            })
        );
    }

    #[test]
    fn test_path_to_pattern_rejects_partial_optional() {
        assert!(matches!(
            path_to_pattern("foo-[[bar]]", false),
            Err(PatternError::OptionalNotFullSegment { .. })
        ));
        assert!(matches!(
            path_to_pattern("[[bar]]-foo", false),
            Err(PatternError::OptionalNotFullSegment { .. })
        ));
    }

    #[test]
    fn test_path_to_pattern_rejects_unbalanced() {
        assert_eq!(
            path_to_pattern("foo/bar]", false),
            Err(PatternError::UnbalancedBrackets {
                path: "foo/bar]".to_string()
            })
        );
    }

    #[test]
    fn test_compare_route_paths() {
        assert_eq!(compare_route_paths("users/new", "users/[id]"), Ordering::Less);
        assert_eq!(
            compare_route_paths("users/[id]", "users/[[id]]"),
            Ordering::Less
        );
        assert_eq!(
            compare_route_paths("users/[[id]]", "users/[...rest]"),
            Ordering::Less
        );
        assert_eq!(compare_route_paths("users", "users/[id]"), Ordering::Less);
    }
}

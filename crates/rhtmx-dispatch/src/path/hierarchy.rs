/// Lazy iterator over the segment keys of a pattern
///
/// Yields `root` first, then every `/`-terminated component in order. The
/// final component (the text after the last `/`) is yielded only when
/// `include_last` is set. The root patterns `/`, `*` and `/*` yield only the
/// root key.
///
/// Returns borrowed slices of the input; nothing is allocated.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::SegmentKeys;
///
/// let keys: Vec<&str> = SegmentKeys::new("/blog/:slug", "", true).collect();
/// assert_eq!(keys, vec!["", "blog", ":slug"]);
///
/// let keys: Vec<&str> = SegmentKeys::new("/blog/:slug", "", false).collect();
/// assert_eq!(keys, vec!["", "blog"]);
/// ```
#[derive(Debug, Clone)]
pub struct SegmentKeys<'a> {
    path: &'a str,
    root: Option<&'a str>,
    /// Start of the component being scanned
    start: usize,
    pos: usize,
    include_last: bool,
    finished: bool,
}

impl<'a> SegmentKeys<'a> {
    pub fn new(path: &'a str, root: &'a str, include_last: bool) -> Self {
        Self {
            path,
            root: Some(root),
            start: 0,
            pos: 0,
            include_last,
            finished: matches!(path, "/" | "*" | "/*"),
        }
    }
}

impl<'a> Iterator for SegmentKeys<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            return Some(root);
        }
        if self.finished {
            return None;
        }

        let bytes = self.path.as_bytes();
        while self.pos < bytes.len() {
            let i = self.pos;
            self.pos += 1;
            if bytes[i] == b'/' {
                let component_start = self.start;
                self.start = i + 1;
                // A leading slash closes no component
                if i > 0 {
                    return Some(&self.path[component_start..i]);
                }
            }
        }

        self.finished = true;
        if self.include_last && self.start < self.path.len() {
            Some(&self.path[self.start..])
        } else {
            None
        }
    }
}

/// Collects [`SegmentKeys`] into a vector
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::path::pattern_to_segments;
///
/// assert_eq!(pattern_to_segments("/", "", true), vec![""]);
/// assert_eq!(pattern_to_segments("/a/b/c", "", true), vec!["", "a", "b", "c"]);
/// ```
pub fn pattern_to_segments<'a>(path: &'a str, root: &'a str, include_last: bool) -> Vec<&'a str> {
    SegmentKeys::new(path, root, include_last).collect()
}

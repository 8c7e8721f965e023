/// Route module
///
/// - `parser`: route specifiers (`blog/[slug]`) to path templates
/// - `pattern`: path templates to regex-backed matchers
/// - `definition`: user-authored routes and their defaults

pub mod definition;
pub mod parser;
pub mod pattern;

// Re-export commonly used types
pub use definition::{ensure_handler, LayoutConfig, Route, RouteConfig, RouteHandler};
pub use parser::{compare_route_paths, is_route_group, path_to_pattern};
pub use pattern::{is_template, PathTemplate};

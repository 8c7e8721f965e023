/// Filesystem route entries
///
/// A crawler walks a pages directory and reports one [`FsRouteFile`] per
/// file: its route specifier (path relative to the pages root, without
/// extension) and what the file declares. [`fs_route_commands`] turns that list
/// into commands the compiler understands.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::fs_routes::{fs_route_commands, FsEntry, FsRouteFile};
/// use rhtmx_dispatch::{Component, Route};
///
/// let files = vec![
///     FsRouteFile::new("blog/[slug]", FsEntry::Page(Route::new())),
///     FsRouteFile::new("blog/new", FsEntry::Page(Route::new())),
///     FsRouteFile::new("blog/_layout", FsEntry::layout(Component::new(|_| String::new()))),
/// ];
///
/// let commands = fs_route_commands(files).unwrap();
/// let kinds: Vec<&str> = commands.iter().map(|c| c.kind()).collect();
/// assert_eq!(kinds, vec!["layout", "route", "route"]);
/// ```

use crate::command::{Command, Fallback, MaybeLazy};
use crate::error::PatternError;
use crate::handler::Middleware;
use crate::render::Component;
use crate::route::{compare_route_paths, path_to_pattern, LayoutConfig, Route, RouteConfig};

/// What a crawled file declares
#[derive(Debug)]
pub enum FsEntry {
    Page(Route),
    Layout {
        component: Component,
        config: Option<LayoutConfig>,
    },
    Middleware(Vec<MaybeLazy<Middleware>>),
    Error(Fallback),
    NotFound(Fallback),
    App(Component),
}

impl FsEntry {
    pub fn layout(component: Component) -> Self {
        FsEntry::Layout {
            component,
            config: None,
        }
    }

    fn is_page(&self) -> bool {
        matches!(self, FsEntry::Page(_))
    }
}

/// One crawled file
#[derive(Debug)]
pub struct FsRouteFile {
    /// Route specifier, e.g. `blog/[slug]` or `(admin)/_layout`
    pub path: String,
    pub entry: FsEntry,
}

impl FsRouteFile {
    pub fn new(path: impl Into<String>, entry: FsEntry) -> Self {
        Self {
            path: path.into(),
            entry,
        }
    }

    /// Directory part of the specifier (`""` at the pages root)
    fn dir(&self) -> &str {
        self.path
            .trim_matches('/')
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }
}

/// Converts crawled files into commands
///
/// Non-page entries come first, in the order given, so every segment is fully
/// decorated before pages flatten their ancestry. Pages follow, most specific
/// first (see [`compare_route_paths`]), because dynamic routes match
/// first-registered-wins.
///
/// Each entry targets the segment of its directory, with route groups kept so
/// `(admin)` pages share `(admin)` layouts. A page registers under the pattern
/// compiled from its own path, unless its config already names one.
///
/// # Errors
///
/// Fails on the first malformed specifier.
pub fn fs_route_commands(files: Vec<FsRouteFile>) -> Result<Vec<Command>, PatternError> {
    let (mut pages, others): (Vec<FsRouteFile>, Vec<FsRouteFile>) =
        files.into_iter().partition(|file| file.entry.is_page());
    pages.sort_by(|a, b| compare_route_paths(&a.path, &b.path));

    let mut commands = Vec::with_capacity(pages.len() + others.len());
    for file in others.into_iter().chain(pages) {
        let segment = path_to_pattern(file.dir(), true)?;
        let command = match file.entry {
            FsEntry::Page(route) => {
                let mut config = route.config.clone().unwrap_or_default();
                if config.route_override.is_none() {
                    config.route_override = Some(path_to_pattern(&file.path, false)?);
                }
                tracing::trace!("Page {} → {:?}", file.path, config.route_override);
                page_command(segment, route, config)
            }
            FsEntry::Layout { component, config } => {
                let command = Command::layout(segment, component);
                match config {
                    Some(config) => command.with_layout_config(config),
                    None => command,
                }
            }
            FsEntry::Middleware(fns) => Command::middleware(segment, fns),
            FsEntry::Error(fallback) => Command::error(segment, fallback),
            FsEntry::NotFound(fallback) => Command::not_found(fallback),
            FsEntry::App(component) => Command::app(component),
        };
        commands.push(command);
    }

    Ok(commands)
}

fn page_command(segment: String, route: Route, config: RouteConfig) -> Command {
    Command::route(segment, route).with_route_config(config)
}

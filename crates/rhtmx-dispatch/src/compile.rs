//! Command compiler
//!
//! Walks a command list once, growing a [`SegmentTree`] and registering one
//! handler chain per method into the [`Router`]. A route's chain is its
//! segment ancestry flattened at the moment the route is declared, followed by
//! a terminal middleware that renders the route.

use std::sync::Arc;

use crate::command::{Command, Lazy, MaybeLazy, RouteSource};
use crate::error::CompileError;
use crate::handler::Middleware;
use crate::method::Method;
use crate::path::{merge_path, to_route_path};
use crate::render::render_route;
use crate::route::{ensure_handler, Route, RouteConfig};
use crate::router::Router;
use crate::segment::{SegmentId, SegmentLayout, SegmentTree};

/// Compiles `commands` into `router`
///
/// Returns the root segment's middlewares, which the dispatcher runs ahead of
/// requests that match no route and ahead of 405 responses.
///
/// # Errors
///
/// Fails on a pattern that does not compile or a filesystem subtree that
/// cannot be expanded. Nothing fails at request time because of a command.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::{apply_commands, Command, Component, Method, Route, Router};
///
/// let mut router = Router::new();
/// let commands = vec![Command::route(
///     "/about",
///     Route::new().with_component(Component::new(|_| "about".into())),
/// )];
/// apply_commands(&mut router, commands, "").unwrap();
///
/// assert_eq!(router.allowed_methods("/about").len(), 7);
/// ```
pub fn apply_commands(
    router: &mut Router<Middleware>,
    commands: Vec<Command>,
    base_path: &str,
) -> Result<Vec<Middleware>, CompileError> {
    let mut tree = SegmentTree::new();
    apply_commands_inner(&mut tree, router, commands, base_path)?;

    let root_middlewares = tree.to_middlewares(SegmentId::ROOT);
    tree.publish();
    Ok(root_middlewares)
}

fn apply_commands_inner(
    tree: &mut SegmentTree,
    router: &mut Router<Middleware>,
    commands: Vec<Command>,
    base_path: &str,
) -> Result<(), CompileError> {
    for command in commands {
        tracing::debug!("Applying {} command", command.kind());

        match command {
            Command::Middleware {
                pattern,
                fns,
                include_last_segment,
            } => {
                let id = tree.get_or_create(&pattern, include_last_segment);
                tree.get_mut(id)
                    .middlewares
                    .extend(fns.into_iter().map(MaybeLazy::into_middleware));
            }
            Command::NotFound { target, .. } => {
                tree.root_mut().not_found = Some(target);
            }
            Command::Error {
                pattern,
                route,
                include_last_segment,
            } => {
                let id = tree.get_or_create(&pattern, include_last_segment);
                tree.get_mut(id).error_route = Some(route);
            }
            Command::App { component } => {
                tree.root_mut().app = Some(component);
            }
            Command::Layout {
                pattern,
                component,
                config,
                include_last_segment,
            } => {
                let id = tree.get_or_create(&pattern, include_last_segment);
                tree.get_mut(id).layout = Some(SegmentLayout {
                    component,
                    config: config.unwrap_or_default(),
                });
            }
            Command::Route {
                pattern,
                route,
                config,
                include_last_segment,
            } => {
                let id = tree.get_or_create(&pattern, include_last_segment);
                let mut chain = tree.to_middlewares(id);

                let registration = RouteRegistration::new(route, config);
                let route_pattern = registration
                    .config
                    .as_ref()
                    .and_then(|c| c.route_override.as_deref())
                    .unwrap_or(&pattern);
                let path = to_route_path(merge_path(base_path, route_pattern, false));

                chain.push(route_terminal(registration.source));
                register(router, &registration.methods, &path, chain)?;
            }
            Command::Handler {
                pattern,
                method,
                fns,
                include_last_segment,
            } => {
                let id = tree.get_or_create(&pattern, include_last_segment);
                let mut chain = tree.to_middlewares(id);
                chain.extend(fns.into_iter().map(MaybeLazy::into_middleware));

                let path = to_route_path(merge_path(base_path, &pattern, false));
                register(router, &method.to_vec(), &path, chain)?;
            }
            Command::FsRoute { pattern, items, .. } => {
                let nested = items
                    .expand()
                    .map_err(|source| CompileError::FsRoutes {
                        pattern: pattern.clone(),
                        source,
                    })?;
                tracing::debug!(
                    "Expanding {} filesystem commands at \"{}\"",
                    nested.len(),
                    pattern
                );
                apply_commands_inner(tree, router, nested, base_path)?;
            }
        }
    }

    Ok(())
}

fn register(
    router: &mut Router<Middleware>,
    methods: &[Method],
    path: &str,
    chain: Vec<Middleware>,
) -> Result<(), CompileError> {
    for &method in methods {
        router.add(method, path, chain.clone())?;
    }
    Ok(())
}

/// A route command resolved into what gets registered
struct RouteRegistration {
    source: RouteSource,
    config: Option<RouteConfig>,
    methods: Vec<Method>,
}

impl RouteRegistration {
    /// Normalizes the route and decides its methods
    ///
    /// A per-method handler map registers its own methods. Otherwise the
    /// command's config (or the route's own) decides, defaulting to all
    /// methods. A lazy route's shape is unknown here, so only the command's
    /// config counts.
    fn new(source: RouteSource, command_config: Option<RouteConfig>) -> Self {
        match source {
            MaybeLazy::Ready(route) => {
                let route = normalize(route, command_config.as_ref());
                let config = route.config.clone();
                let methods = route
                    .handler
                    .as_ref()
                    .and_then(|handler| handler.methods())
                    .unwrap_or_else(|| config_methods(config.as_ref()));
                Self {
                    source: MaybeLazy::Ready(route),
                    config,
                    methods,
                }
            }
            MaybeLazy::Lazy(lazy) => {
                let methods = config_methods(command_config.as_ref());
                let override_config = command_config.clone();
                let normalized = Lazy::new(move || {
                    let lazy = lazy.clone();
                    let config = override_config.clone();
                    async move {
                        lazy.get()
                            .await
                            .map(|route| normalize(Arc::clone(route), config.as_ref()))
                    }
                });
                Self {
                    source: MaybeLazy::Lazy(normalized),
                    config: command_config,
                    methods,
                }
            }
        }
    }
}

fn config_methods(config: Option<&RouteConfig>) -> Vec<Method> {
    config.map(|c| c.methods.to_vec()).unwrap_or_else(|| Method::ALL.to_vec())
}

/// Fills in default handlers and applies the command's config over the
/// route's own, so rendering sees the same config that chose the methods
fn normalize(route: Arc<Route>, command_config: Option<&RouteConfig>) -> Arc<Route> {
    if command_config.is_none() && !route.needs_defaults() {
        return route;
    }

    let mut route = (*route).clone();
    if let Some(config) = command_config {
        route.config = Some(config.clone());
    }
    Arc::new(ensure_handler(route))
}

/// Last link of a route chain: resolve the route and render it
fn route_terminal(source: RouteSource) -> Middleware {
    Middleware::new(move |ctx| {
        let source = source.clone();
        Box::pin(async move {
            let route = source.resolve().await?;
            ctx.push_css(route.css.iter().cloned());
            render_route(ctx, &route, None).await
        })
    })
}

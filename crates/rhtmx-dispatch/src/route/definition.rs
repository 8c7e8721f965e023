/// User-authored route definitions
///
/// A `Route` bundles an optional component, an optional handler and an
/// optional config. Before registration every route goes through
/// [`ensure_handler`] so dispatch never meets a route without a handler.

use std::collections::HashMap;

use crate::handler::Handler;
use crate::method::{Method, Methods};
use crate::render::Component;

/// Handler of a route: one function for every method, or one per method
#[derive(Debug, Clone)]
pub enum RouteHandler {
    Single(Handler),
    ByMethod(HashMap<Method, Handler>),
}

impl RouteHandler {
    /// Methods a per-method map answers, in canonical order
    ///
    /// `None` for a single handler, which answers whatever it is registered for.
    pub fn methods(&self) -> Option<Vec<Method>> {
        match self {
            RouteHandler::Single(_) => None,
            RouteHandler::ByMethod(map) => Some(
                Method::ALL
                    .into_iter()
                    .filter(|m| map.contains_key(m))
                    .collect(),
            ),
        }
    }
}

/// Per-route options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteConfig {
    /// Methods to register when the handler is not a per-method map
    pub methods: Methods,
    /// Pathname to register instead of the command pattern
    pub route_override: Option<String>,
    pub skip_app_wrapper: bool,
    pub skip_inherited_layouts: bool,
}

/// Per-layout options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutConfig {
    /// Drop the app wrapper for pages under this layout
    pub skip_app_wrapper: bool,
    /// Discard layouts inherited from ancestor segments
    pub skip_inherited_layouts: bool,
}

/// A route definition
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::{ensure_handler, Route};
/// use rhtmx_dispatch::Component;
///
/// let route = ensure_handler(Route::new().with_component(Component::new(|_| "<h1>Hi</h1>".into())));
/// assert!(route.handler.is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Route {
    pub component: Option<Component>,
    pub handler: Option<RouteHandler>,
    pub config: Option<RouteConfig>,
    /// Stylesheets pushed into the render state before rendering
    pub css: Vec<String>,
}

impl Route {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    /// Sets a handler answering every registered method
    pub fn with_handler(mut self, handler: Handler) -> Self {
        self.handler = Some(RouteHandler::Single(handler));
        self
    }

    /// Adds a per-method handler, replacing a single handler if one was set
    pub fn with_method_handler(mut self, method: Method, handler: Handler) -> Self {
        match &mut self.handler {
            Some(RouteHandler::ByMethod(map)) => {
                map.insert(method, handler);
            }
            _ => {
                self.handler = Some(RouteHandler::ByMethod(HashMap::from([(method, handler)])));
            }
        }
        self
    }

    pub fn with_config(mut self, config: RouteConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_css(mut self, href: impl Into<String>) -> Self {
        self.css.push(href.into());
        self
    }

    /// Whether the route still needs [`ensure_handler`]
    pub(crate) fn needs_defaults(&self) -> bool {
        match &self.handler {
            None => true,
            Some(RouteHandler::ByMethod(map)) => {
                self.component.is_some() && !map.contains_key(&Method::Get)
            }
            Some(RouteHandler::Single(_)) => false,
        }
    }
}

/// Fills in default handlers
///
/// - no handler and a component: render the component
/// - no handler and no component: always 404
/// - a method map with a component but no `GET`: add a `GET` that renders
///   the component
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::route::{ensure_handler, Route, RouteHandler};
///
/// let route = ensure_handler(Route::new());
/// assert!(matches!(route.handler, Some(RouteHandler::Single(_))));
/// ```
pub fn ensure_handler(mut route: Route) -> Route {
    let has_component = route.component.is_some();

    match &mut route.handler {
        None => {
            let handler = if has_component {
                Handler::render_component()
            } else {
                Handler::not_found()
            };
            route.handler = Some(RouteHandler::Single(handler));
        }
        Some(RouteHandler::ByMethod(map)) if has_component => {
            map.entry(Method::Get)
                .or_insert_with(Handler::render_component);
        }
        Some(_) => {}
    }

    route
}

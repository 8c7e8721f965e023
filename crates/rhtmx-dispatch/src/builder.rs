//! Application assembly
//!
//! [`AppBuilder`] collects commands through consuming `with_*` calls and
//! compiles them into a [`Dispatcher`].

use std::future::Future;
use std::sync::Arc;

use crate::command::{Command, Fallback};
use crate::compile::apply_commands;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::CompileError;
use crate::fs_routes::{fs_route_commands, FsRouteFile};
use crate::handler::Middleware;
use crate::method::{Method, Methods};
use crate::render::{Component, HtmlRenderer, RenderEngine};
use crate::route::Route;
use crate::router::Router;

/// Builder for a [`Dispatcher`]
///
/// Commands apply in the order they were added.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::{page, AppBuilder, Component, Handler, Route};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let app = AppBuilder::new()
///     .with_layout("/", Component::new(|p| format!("<main>{}</main>", p.children.unwrap_or(""))))
///     .with_route(
///         "/users/:id",
///         Route::new()
///             .with_component(Component::new(|p| format!("user {}", p.params["id"])))
///             .with_handler(Handler::new(|_ctx| Box::pin(async { Ok(page(serde_json::Value::Null)) }))),
///     )
///     .build()
///     .unwrap();
///
/// let req = axum::http::Request::get("/users/7").body(String::new()).unwrap();
/// let res = app.handle(req).await;
/// assert_eq!(res.body(), "<main>user 7</main>");
/// # }
/// ```
pub struct AppBuilder {
    commands: Vec<Command>,
    config: Config,
    renderer: Arc<dyn RenderEngine>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            config: Config::default(),
            renderer: Arc::new(HtmlRenderer),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_renderer(mut self, renderer: impl RenderEngine + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Appends a raw command
    pub fn with_command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn with_commands<I>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = Command>,
    {
        self.commands.extend(commands);
        self
    }

    /// Middleware for every request at or below `pattern`
    pub fn with_middleware(self, pattern: impl Into<String>, middleware: Middleware) -> Self {
        self.with_command(Command::middleware(pattern, [middleware]))
    }

    pub fn with_layout(self, pattern: impl Into<String>, component: Component) -> Self {
        self.with_command(Command::layout(pattern, component))
    }

    pub fn with_app(self, component: Component) -> Self {
        self.with_command(Command::app(component))
    }

    pub fn with_route(self, pattern: impl Into<String>, route: Route) -> Self {
        self.with_command(Command::route(pattern, route))
    }

    pub fn with_lazy_route<F, Fut>(self, pattern: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Route>> + Send + 'static,
    {
        self.with_command(Command::lazy_route(pattern, loader))
    }

    pub fn with_error(self, pattern: impl Into<String>, fallback: impl Into<Fallback>) -> Self {
        self.with_command(Command::error(pattern, fallback))
    }

    pub fn with_not_found(self, fallback: impl Into<Fallback>) -> Self {
        self.with_command(Command::not_found(fallback))
    }

    /// Splices crawled filesystem routes at this position
    pub fn with_fs_routes(self, pattern: impl Into<String>, files: Vec<FsRouteFile>) -> Self {
        self.with_command(Command::fs_route(pattern, move || {
            Ok(fs_route_commands(files)?)
        }))
    }

    /// Handler answering `methods` at `pattern`
    pub fn with_handler(
        self,
        pattern: impl Into<String>,
        methods: impl Into<Methods>,
        handler: Middleware,
    ) -> Self {
        self.with_command(Command::handler(pattern, methods, [handler]))
    }

    pub fn with_get(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Get, handler)
    }

    pub fn with_head(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Head, handler)
    }

    pub fn with_post(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Post, handler)
    }

    pub fn with_put(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Put, handler)
    }

    pub fn with_patch(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Patch, handler)
    }

    pub fn with_delete(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Delete, handler)
    }

    pub fn with_options(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Method::Options, handler)
    }

    /// Handler answering all seven methods
    pub fn with_all(self, pattern: impl Into<String>, handler: Middleware) -> Self {
        self.with_handler(pattern, Methods::All, handler)
    }

    /// Compiles every command into a dispatcher
    ///
    /// # Errors
    ///
    /// Fails on malformed patterns or filesystem routes that cannot be
    /// expanded.
    pub fn build(self) -> Result<Dispatcher, CompileError> {
        let mut router = Router::new();
        let count = self.commands.len();
        let root_middlewares =
            apply_commands(&mut router, self.commands, self.config.routing.base_path())?;

        tracing::debug!(
            "Compiled {} commands (base path \"{}\")",
            count,
            self.config.routing.base_path()
        );

        Ok(Dispatcher::new(
            router,
            root_middlewares,
            self.renderer,
            self.config.routing,
        ))
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

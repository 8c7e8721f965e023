//! # RHTMX Dispatch
//!
//! Route compilation and request dispatch. An application is declared as an
//! ordered list of [`Command`]s (routes, handlers, middlewares, layouts, error
//! and not-found fallbacks, crawled filesystem subtrees); [`apply_commands`]
//! compiles them into a [`Router`] of per-method handler chains.
//!
//! - Static routes (`/about`) match by exact lookup
//! - Dynamic routes (`/users/:id`, `/docs/:rest*`, `/posts{/:id}?`) match in
//!   registration order, first match wins
//! - Middlewares, layouts and error fallbacks are inherited along the path
//! - `HEAD` falls back to `GET`; a known path with the wrong method is a 405
//! - Lazy routes load once, on the first request that needs them
//!
//! ## Filesystem specifiers
//!
//! [`route::path_to_pattern`] compiles file paths into route patterns:
//! - `users/[id]` → `/users/:id`
//! - `docs/[...slug]` → `/docs/:slug*`
//! - `posts/[[id]]` → `/posts{/:id}?`
//! - `(admin)/users` → `/users`
//! - `blog/index` → `/blog`
//!
//! ## Example
//!
//! ```
//! use rhtmx_dispatch::{AppBuilder, Middleware, text_response};
//! use axum::http::{Request, StatusCode};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let app = AppBuilder::new()
//!     .with_get("/hello/:name", Middleware::new(|ctx| {
//!         Box::pin(async move {
//!             Ok(text_response(StatusCode::OK, format!("hello {}", ctx.params["name"])))
//!         })
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let res = app.handle(Request::get("/hello/ana").body(String::new()).unwrap()).await;
//! assert_eq!(res.body(), "hello ana");
//!
//! let res = app.handle(Request::post("/hello/ana").body(String::new()).unwrap()).await;
//! assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
//! # }
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

pub mod builder;
pub mod command;
pub mod compile;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fs_routes;
pub mod handler;
pub mod method;
pub mod path;
pub mod render;
pub mod route;
pub mod router;
pub mod segment;
pub mod service;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::AppBuilder;
pub use command::{Command, Fallback, Lazy, MaybeLazy, RouteSource};
pub use compile::apply_commands;
pub use config::{Config, RoutingConfig, ServerConfig};
pub use dispatch::Dispatcher;
pub use error::{CompileError, HttpError, PatternError, UnknownMethod};
pub use handler::{
    html_response, page, text_response, BoxFuture, Context, Handler, Middleware, Outcome,
    PageData, RenderState, Response,
};
pub use method::{Method, Methods, RouteByMethod};
pub use path::{merge_path, normalize_path, pattern_to_segments, to_route_path};
pub use render::{render_route, Component, ComponentProps, HtmlRenderer, RenderEngine, RenderRequest};
pub use route::{ensure_handler, LayoutConfig, Route, RouteConfig, RouteHandler};
pub use router::{RouteResult, Router};
pub use service::serve;

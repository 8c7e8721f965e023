//! Request context, middleware and route handler types
//!
//! A matched request runs as one flat chain of middlewares. Each middleware
//! receives `&mut Context` and decides whether to continue with
//! [`Context::next`]. The last entry of a route chain is the terminal handler
//! the compiler appends.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Request, StatusCode};
use serde_json::Value;

use crate::error::HttpError;
use crate::method::Method;
use crate::render::{Component, RenderEngine};

/// Boxed `Send` future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Response type produced by handlers
pub type Response = axum::http::Response<String>;

type MiddlewareFn =
    dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, anyhow::Result<Response>> + Send + Sync;

type HandlerFn =
    dyn for<'a> Fn(&'a mut Context) -> BoxFuture<'a, anyhow::Result<Outcome>> + Send + Sync;

/// A link in a request chain
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::Middleware;
///
/// let logger = Middleware::new(|ctx| {
///     Box::pin(async move {
///         let res = ctx.next().await;
///         tracing::info!("{} {}", ctx.method, ctx.path);
///         res
///     })
/// });
/// ```
#[derive(Clone)]
pub struct Middleware(Arc<MiddlewareFn>);

impl Middleware {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, anyhow::Result<Response>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call<'a>(&self, ctx: &'a mut Context) -> BoxFuture<'a, anyhow::Result<Response>> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Middleware")
    }
}

/// A route handler: returns a finished response or page data to render
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context) -> BoxFuture<'a, anyhow::Result<Outcome>>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call<'a>(&self, ctx: &'a mut Context) -> BoxFuture<'a, anyhow::Result<Outcome>> {
        (self.0)(ctx)
    }

    /// Handler that renders the route component with empty data
    pub fn render_component() -> Self {
        Self::new(|_ctx| Box::pin(async { Ok(page(Value::Null)) }))
    }

    /// Handler that always fails with 404
    pub fn not_found() -> Self {
        Self::new(|_ctx| Box::pin(async { Err(HttpError::not_found().into()) }))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

/// What a route handler produced
#[derive(Debug)]
pub enum Outcome {
    /// Sent as-is
    Response(Response),
    /// Rendered through the route component
    Page(PageData),
}

impl From<Response> for Outcome {
    fn from(res: Response) -> Self {
        Outcome::Response(res)
    }
}

/// Data handed to the route component
#[derive(Debug, Clone, Default)]
pub struct PageData {
    pub data: Value,
    pub status: Option<StatusCode>,
}

/// Renders the route component with `data`
pub fn page(data: impl Into<Value>) -> Outcome {
    Outcome::Page(PageData {
        data: data.into(),
        status: None,
    })
}

/// Plain-text response
pub fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
    with_content_type(status, body.into(), "text/plain; charset=utf-8")
}

/// HTML response
pub fn html_response(status: StatusCode, body: impl Into<String>) -> Response {
    with_content_type(status, body.into(), "text/html; charset=utf-8")
}

fn with_content_type(status: StatusCode, body: String, content_type: &'static str) -> Response {
    let mut res = Response::new(body);
    *res.status_mut() = status;
    res.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    res
}

/// Layout/app/stylesheet state accumulated by segment middlewares
#[derive(Clone, Default)]
pub struct RenderState {
    pub app: Option<Component>,
    pub layouts: Vec<Component>,
    pub css: Vec<String>,
}

/// Per-request context threaded through a chain
pub struct Context {
    /// Request method
    pub method: Method,
    /// Pathname used for matching
    pub path: String,
    /// Decoded path parameters
    pub params: HashMap<String, String>,
    /// Pattern that matched, if any
    pub pattern: Option<String>,
    /// Free-form state shared between middlewares
    pub state: serde_json::Map<String, Value>,
    /// Error being rendered by an error fallback
    pub error: Option<Arc<anyhow::Error>>,
    request: Request<String>,
    chain: Arc<[Middleware]>,
    cursor: usize,
    render_state: RenderState,
    renderer: Arc<dyn RenderEngine>,
}

impl Context {
    /// Creates a context with an empty chain
    pub fn new(method: Method, request: Request<String>, renderer: Arc<dyn RenderEngine>) -> Self {
        Self {
            method,
            path: request.uri().path().to_string(),
            params: HashMap::new(),
            pattern: None,
            state: serde_json::Map::new(),
            error: None,
            request,
            chain: Arc::from(Vec::new()),
            cursor: 0,
            render_state: RenderState::default(),
            renderer,
        }
    }

    /// Replaces the chain and rewinds to its start
    pub fn with_chain(mut self, chain: Vec<Middleware>) -> Self {
        self.chain = Arc::from(chain);
        self.cursor = 0;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params = params;
        self
    }

    pub fn with_pattern(mut self, pattern: Option<String>) -> Self {
        self.pattern = pattern;
        self
    }

    /// Runs the next middleware in the chain
    ///
    /// Running past the end of the chain fails with 404.
    pub fn next(&mut self) -> BoxFuture<'_, anyhow::Result<Response>> {
        match self.chain.get(self.cursor).cloned() {
            Some(middleware) => {
                self.cursor += 1;
                middleware.call(self)
            }
            None => Box::pin(async { Err(HttpError::not_found().into()) }),
        }
    }

    pub fn request(&self) -> &Request<String> {
        &self.request
    }

    pub fn renderer(&self) -> Arc<dyn RenderEngine> {
        Arc::clone(&self.renderer)
    }

    pub fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    pub(crate) fn render_state_mut(&mut self) -> &mut RenderState {
        &mut self.render_state
    }

    /// Queues stylesheets for the rendered page, skipping duplicates
    pub fn push_css<I, S>(&mut self, hrefs: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for href in hrefs {
            let href = href.into();
            if !self.render_state.css.contains(&href) {
                self.render_state.css.push(href);
            }
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("params", &self.params)
            .field("pattern", &self.pattern)
            .finish()
    }
}

//! Request dispatcher
//!
//! Turns one request into one response using a compiled [`Router`]:
//!
//! - unsupported method: 501
//! - matched pattern and method: run the route chain
//! - matched pattern, other method: run the root middlewares, ending in a
//!   405 with an `Allow` header
//! - no match: run the root middlewares, which end in a 404
//!
//! Errors escaping the chain become plain responses; `HEAD` responses lose
//! their body.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Request, StatusCode};

use crate::config::RoutingConfig;
use crate::error::HttpError;
use crate::handler::{text_response, Context, Middleware, Response};
use crate::method::Method;
use crate::path::normalize_path;
use crate::render::RenderEngine;
use crate::router::Router;

/// A compiled application, ready to serve requests
pub struct Dispatcher {
    router: Router<Middleware>,
    root_middlewares: Vec<Middleware>,
    renderer: Arc<dyn RenderEngine>,
    config: RoutingConfig,
}

impl Dispatcher {
    pub fn new(
        router: Router<Middleware>,
        root_middlewares: Vec<Middleware>,
        renderer: Arc<dyn RenderEngine>,
        config: RoutingConfig,
    ) -> Self {
        Self {
            router,
            root_middlewares,
            renderer,
            config,
        }
    }

    pub fn router(&self) -> &Router<Middleware> {
        &self.router
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// Handles one request
    pub async fn handle(&self, req: Request<String>) -> Response {
        let method = match Method::try_from(req.method()) {
            Ok(method) => method,
            Err(err) => {
                tracing::debug!("{}", err);
                return status_response(StatusCode::NOT_IMPLEMENTED);
            }
        };

        let path = if self.config.trailing_slash {
            req.uri().path().to_string()
        } else {
            normalize_path(req.uri().path()).into_owned()
        };

        let result = self.router.match_route(method, &path, Vec::new());

        let chain = if result.method_match {
            result.handlers
        } else if let Some(pattern) = &result.pattern {
            tracing::debug!("405 {} {} (pattern {})", method, path, pattern);
            let mut chain = self.root_middlewares.clone();
            chain.push(method_not_allowed_terminal(
                self.router.allowed_methods(pattern),
            ));
            chain
        } else {
            tracing::debug!("404 {} {}", method, path);
            // Running past the last root middleware raises the 404
            self.root_middlewares.clone()
        };

        let mut ctx = Context::new(method, req, Arc::clone(&self.renderer))
            .with_path(path)
            .with_params(result.params)
            .with_pattern(result.pattern)
            .with_chain(chain);

        let mut res = match ctx.next().await {
            Ok(res) => res,
            Err(err) => error_response(&err),
        };

        if method == Method::Head {
            res.body_mut().clear();
        }

        res
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn status_response(status: StatusCode) -> Response {
    text_response(status, status.canonical_reason().unwrap_or_default())
}

fn method_not_allowed(allowed: &[Method]) -> Response {
    let mut res = status_response(StatusCode::METHOD_NOT_ALLOWED);
    let allow = allowed
        .iter()
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    // Method names are plain ASCII tokens
    if let Ok(value) = HeaderValue::from_str(&allow) {
        res.headers_mut().insert(header::ALLOW, value);
    }
    res
}

fn method_not_allowed_terminal(allowed: Vec<Method>) -> Middleware {
    Middleware::new(move |_ctx| {
        let res = method_not_allowed(&allowed);
        Box::pin(async move { Ok(res) })
    })
}

fn error_response(err: &anyhow::Error) -> Response {
    match err.downcast_ref::<HttpError>() {
        Some(http) => status_response(http.status),
        None => {
            tracing::error!("Internal server error: {:#}", err);
            status_response(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

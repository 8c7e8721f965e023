//! Rendering seam
//!
//! Turning a component into markup belongs to the render engine; this module
//! only decides *what* gets rendered (route handler outcome, inherited
//! layouts, app wrapper, stylesheets) and hands it to a [`RenderEngine`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use axum::http::StatusCode;
use serde_json::Value;

use crate::error::HttpError;
use crate::handler::{html_response, Context, Handler, Outcome, PageData, Response};
use crate::method::Method;
use crate::route::{Route, RouteHandler};

type ComponentFn = dyn Fn(&ComponentProps<'_>) -> String + Send + Sync;

/// A renderable unit: page, layout or app wrapper
#[derive(Clone)]
pub struct Component(Arc<ComponentFn>);

impl Component {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ComponentProps<'_>) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn render(&self, props: &ComponentProps<'_>) -> String {
        (self.0)(props)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Component")
    }
}

/// Props passed to a component
pub struct ComponentProps<'a> {
    pub data: &'a Value,
    pub params: &'a HashMap<String, String>,
    pub path: &'a str,
    pub status: StatusCode,
    pub error: Option<&'a anyhow::Error>,
    /// Rendered inner content, for layouts and the app wrapper
    pub children: Option<&'a str>,
}

/// Everything the engine needs to produce one page
pub struct RenderRequest<'a> {
    pub component: &'a Component,
    pub data: &'a Value,
    pub status: StatusCode,
    /// Outermost first
    pub layouts: &'a [Component],
    pub app: Option<&'a Component>,
    pub css: &'a [String],
}

/// Produces a response from a render request
pub trait RenderEngine: Send + Sync {
    fn render(&self, ctx: &Context, request: RenderRequest<'_>) -> anyhow::Result<Response>;
}

/// Default engine: plain string composition
///
/// The page renders first, then each layout wraps it innermost-first, then
/// the app wrapper. Stylesheet links are prepended.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl RenderEngine for HtmlRenderer {
    fn render(&self, ctx: &Context, request: RenderRequest<'_>) -> anyhow::Result<Response> {
        let mut body = request.component.render(&props(ctx, &request, None));

        for layout in request.layouts.iter().rev() {
            body = layout.render(&props(ctx, &request, Some(&body)));
        }

        if let Some(app) = request.app {
            body = app.render(&props(ctx, &request, Some(&body)));
        }

        if !request.css.is_empty() {
            let links: String = request
                .css
                .iter()
                .map(|href| format!("<link rel=\"stylesheet\" href=\"{}\">", href))
                .collect();
            body = links + &body;
        }

        Ok(html_response(request.status, body))
    }
}

fn props<'a>(
    ctx: &'a Context,
    request: &'a RenderRequest<'a>,
    children: Option<&'a str>,
) -> ComponentProps<'a> {
    ComponentProps {
        data: request.data,
        params: &ctx.params,
        path: &ctx.path,
        status: request.status,
        error: ctx.error.as_deref(),
        children,
    }
}

/// Runs a route's handler and renders its component when asked to
///
/// A method map without an entry for the request method fails with 405
/// (`HEAD` falls back to `GET`). `status` overrides the default 200, which is
/// how error fallbacks keep the failing status.
pub async fn render_route(
    ctx: &mut Context,
    route: &Route,
    status: Option<StatusCode>,
) -> anyhow::Result<Response> {
    let handler = select_handler(route, ctx.method)?;

    let PageData {
        data,
        status: page_status,
    } = match handler.call(ctx).await? {
        Outcome::Response(res) => return Ok(res),
        Outcome::Page(page) => page,
    };

    let component = route
        .component
        .as_ref()
        .ok_or_else(|| anyhow!("Route returned page data but has no component to render"))?;

    let config = route.config.as_ref();
    let renderer = ctx.renderer();
    let state = ctx.render_state();

    let app = if config.is_some_and(|c| c.skip_app_wrapper) {
        None
    } else {
        state.app.as_ref()
    };
    let layouts: &[Component] = if config.is_some_and(|c| c.skip_inherited_layouts) {
        &[]
    } else {
        &state.layouts
    };

    renderer.render(
        ctx,
        RenderRequest {
            component,
            data: &data,
            status: page_status.or(status).unwrap_or(StatusCode::OK),
            layouts,
            app,
            css: &state.css,
        },
    )
}

fn select_handler(route: &Route, method: Method) -> anyhow::Result<Handler> {
    match &route.handler {
        Some(RouteHandler::Single(handler)) => Ok(handler.clone()),
        Some(RouteHandler::ByMethod(by_method)) => by_method
            .get(&method)
            .or_else(|| {
                (method == Method::Head)
                    .then(|| by_method.get(&Method::Get))
                    .flatten()
            })
            .cloned()
            .ok_or_else(|| HttpError::method_not_allowed().into()),
        // Unnormalized route: apply the same defaults `ensure_handler` would
        None if route.component.is_some() => Ok(Handler::render_component()),
        None => Err(HttpError::not_found().into()),
    }
}

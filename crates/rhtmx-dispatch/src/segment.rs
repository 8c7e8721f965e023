//! Segment tree
//!
//! Every path prefix that a command touches gets a [`Segment`] holding what
//! requests below it inherit: middlewares, a layout, an error fallback, and
//! (root only) the app wrapper and not-found fallback.
//!
//! Segments live in an arena and are addressed by [`SegmentId`]. The tree only
//! grows while commands are applied; [`SegmentTree::publish`] then freezes it
//! so request-time segment middlewares can read it without locking.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use anyhow::anyhow;
use axum::http::StatusCode;

use crate::command::Fallback;
use crate::error::HttpError;
use crate::handler::{Context, Middleware, RenderState, Response};
use crate::path::SegmentKeys;
use crate::render::{render_route, Component};
use crate::route::{ensure_handler, LayoutConfig};

/// Index of a segment in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(usize);

impl SegmentId {
    pub const ROOT: SegmentId = SegmentId(0);
}

/// Layout attached to a segment
#[derive(Debug, Clone)]
pub struct SegmentLayout {
    pub component: Component,
    pub config: LayoutConfig,
}

/// One node of the tree
#[derive(Debug, Clone)]
pub struct Segment {
    /// Path component this segment stands for (`""` for the root)
    pub path: String,
    pub parent: Option<SegmentId>,
    children: HashMap<String, SegmentId>,
    pub middlewares: Vec<Middleware>,
    pub layout: Option<SegmentLayout>,
    pub error_route: Option<Fallback>,
    pub not_found: Option<Fallback>,
    pub app: Option<Component>,
}

impl Segment {
    fn new(path: impl Into<String>, parent: Option<SegmentId>) -> Self {
        Self {
            path: path.into(),
            parent,
            children: HashMap::new(),
            middlewares: Vec::new(),
            layout: None,
            error_route: None,
            not_found: None,
            app: None,
        }
    }
}

type Published = Arc<OnceLock<Vec<Segment>>>;

/// Arena of segments rooted at [`SegmentId::ROOT`]
#[derive(Debug)]
pub struct SegmentTree {
    segments: Vec<Segment>,
    published: Published,
}

impl SegmentTree {
    pub fn new() -> Self {
        Self {
            segments: vec![Segment::new("", None)],
            published: Arc::new(OnceLock::new()),
        }
    }

    /// Adds a child segment under `parent`
    pub fn new_segment(&mut self, path: &str, parent: SegmentId) -> SegmentId {
        let id = SegmentId(self.segments.len());
        self.segments.push(Segment::new(path, Some(parent)));
        self.segments[parent.0].children.insert(path.to_string(), id);
        id
    }

    /// Walks `pattern` from the root, creating missing segments
    ///
    /// # Examples
    ///
    /// ```
    /// use rhtmx_dispatch::segment::{SegmentId, SegmentTree};
    ///
    /// let mut tree = SegmentTree::new();
    /// let blog = tree.get_or_create("/blog/:slug", false);
    /// assert_eq!(tree.get_or_create("/blog", true), blog);
    /// assert_eq!(tree.get_or_create("/", true), SegmentId::ROOT);
    /// ```
    pub fn get_or_create(&mut self, pattern: &str, include_last: bool) -> SegmentId {
        SegmentKeys::new(pattern, "", include_last)
            .skip(1)
            .fold(SegmentId::ROOT, |current, key| {
                match self.segments[current.0].children.get(key) {
                    Some(&child) => child,
                    None => self.new_segment(key, current),
                }
            })
    }

    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    pub fn get_mut(&mut self, id: SegmentId) -> &mut Segment {
        &mut self.segments[id.0]
    }

    pub fn root(&self) -> &Segment {
        self.get(SegmentId::ROOT)
    }

    pub fn root_mut(&mut self) -> &mut Segment {
        self.get_mut(SegmentId::ROOT)
    }

    /// Ancestors of `id`, root first, `id` last
    pub fn ancestry(&self, id: SegmentId) -> Vec<SegmentId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.segments[current.0].parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    /// Flattens the middlewares a request below `id` runs through
    ///
    /// For each ancestor, root first: a segment middleware (layout, app and
    /// error handling), then that segment's own middlewares as registered so
    /// far. Layouts and fallbacks are read at request time from the published
    /// tree, so declarations made after this call still apply to them.
    pub fn to_middlewares(&self, id: SegmentId) -> Vec<Middleware> {
        self.ancestry(id)
            .into_iter()
            .flat_map(|segment_id| {
                std::iter::once(segment_middleware(Arc::clone(&self.published), segment_id))
                    .chain(self.segments[segment_id.0].middlewares.iter().cloned())
            })
            .collect()
    }

    /// Freezes the tree for request-time reads
    pub fn publish(self) {
        // Each tree owns a fresh cell, so this is the only write
        let _ = self.published.set(self.segments);
    }
}

impl Default for SegmentTree {
    fn default() -> Self {
        Self::new()
    }
}

fn segment_middleware(published: Published, id: SegmentId) -> Middleware {
    Middleware::new(move |ctx| {
        let published = Arc::clone(&published);
        Box::pin(async move {
            let segments = published
                .get()
                .ok_or_else(|| anyhow!("Segment tree used before compilation finished"))?;
            let segment = &segments[id.0];

            let saved = ctx.render_state().clone();
            enter_segment(segment, ctx.render_state_mut());

            let result = match ctx.next().await {
                Ok(res) => Ok(res),
                Err(err) => handle_error(segments, segment, id, ctx, err).await,
            };

            *ctx.render_state_mut() = saved;
            result
        })
    })
}

fn enter_segment(segment: &Segment, state: &mut RenderState) {
    if let Some(app) = &segment.app {
        state.app = Some(app.clone());
    }

    if let Some(layout) = &segment.layout {
        if layout.config.skip_app_wrapper {
            state.app = None;
        }
        if layout.config.skip_inherited_layouts {
            state.layouts.clear();
        }
        state.layouts.push(layout.component.clone());
    }
}

async fn handle_error(
    segments: &[Segment],
    segment: &Segment,
    id: SegmentId,
    ctx: &mut Context,
    err: anyhow::Error,
) -> anyhow::Result<Response> {
    let status = HttpError::status_of(&err);
    let root_not_found = segments[SegmentId::ROOT.0].not_found.as_ref();

    if status == StatusCode::NOT_FOUND {
        if let Some(fallback) = root_not_found {
            if id != SegmentId::ROOT {
                // The root segment renders it with only root state applied
                return Err(err);
            }
            tracing::debug!("Rendering not-found fallback for {}", ctx.path);
            ctx.error = Some(Arc::new(err));
            return run_fallback(fallback, ctx, status).await;
        }
    }

    match &segment.error_route {
        Some(fallback) => {
            tracing::debug!(
                "Rendering error fallback at segment \"{}\" with status {}",
                segment.path,
                status
            );
            ctx.error = Some(Arc::new(err));
            run_fallback(fallback, ctx, status).await
        }
        None => Err(err),
    }
}

async fn run_fallback(
    fallback: &Fallback,
    ctx: &mut Context,
    status: StatusCode,
) -> anyhow::Result<Response> {
    match fallback {
        Fallback::Middleware(middleware) => middleware.call(ctx).await,
        Fallback::Route(source) => {
            let route = source.resolve().await?;
            if route.needs_defaults() {
                let route = ensure_handler((*route).clone());
                render_route(ctx, &route, Some(status)).await
            } else {
                render_route(ctx, &route, Some(status)).await
            }
        }
    }
}

//! Declarative route-tree commands
//!
//! An application is described as an ordered list of [`Command`]s. Hand-written
//! lists and crawled filesystem trees use the same vocabulary; an
//! [`Command::FsRoute`] splices a nested list in place when compiled.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::handler::{BoxFuture, Middleware};
use crate::method::Methods;
use crate::render::Component;
use crate::route::{LayoutConfig, Route, RouteConfig};

type Loader<T> = dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync;

/// A value loaded on first use
///
/// The loader runs at most once, even when many requests race for the first
/// access; every caller observes the same value. A failed load is returned to
/// the caller and the next access tries again.
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::Lazy;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let greeting = Lazy::new(|| async { Ok("hello".to_string()) });
/// assert_eq!(greeting.get().await.unwrap(), "hello");
/// # }
/// ```
pub struct Lazy<T> {
    cell: Arc<OnceCell<T>>,
    loader: Arc<Loader<T>>,
}

impl<T: Send + Sync + 'static> Lazy<T> {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            cell: Arc::new(OnceCell::new()),
            loader: Arc::new(move || -> BoxFuture<'static, anyhow::Result<T>> {
                Box::pin(loader())
            }),
        }
    }

    /// Loads the value on first call, then returns the cached one
    pub async fn get(&self) -> anyhow::Result<&T> {
        self.cell.get_or_try_init(|| (self.loader)()).await
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

impl<T> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<T> fmt::Debug for Lazy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lazy")
            .field("loaded", &self.cell.initialized())
            .finish()
    }
}

/// A value that is either present now or loaded on first use
#[derive(Debug, Clone)]
pub enum MaybeLazy<T> {
    Ready(T),
    Lazy(Lazy<T>),
}

impl<T: Clone + Send + Sync + 'static> MaybeLazy<T> {
    pub async fn resolve(&self) -> anyhow::Result<T> {
        match self {
            MaybeLazy::Ready(value) => Ok(value.clone()),
            MaybeLazy::Lazy(lazy) => lazy.get().await.cloned(),
        }
    }
}

impl<T> From<T> for MaybeLazy<T> {
    fn from(value: T) -> Self {
        MaybeLazy::Ready(value)
    }
}

impl<T> From<Lazy<T>> for MaybeLazy<T> {
    fn from(lazy: Lazy<T>) -> Self {
        MaybeLazy::Lazy(lazy)
    }
}

impl From<Route> for MaybeLazy<Arc<Route>> {
    fn from(route: Route) -> Self {
        MaybeLazy::Ready(Arc::new(route))
    }
}

impl MaybeLazy<Middleware> {
    /// A middleware that loads the real one on first call and delegates to it
    pub fn into_middleware(self) -> Middleware {
        match self {
            MaybeLazy::Ready(middleware) => middleware,
            MaybeLazy::Lazy(lazy) => Middleware::new(move |ctx| {
                let lazy = lazy.clone();
                Box::pin(async move {
                    let middleware = lazy.get().await?.clone();
                    middleware.call(ctx).await
                })
            }),
        }
    }
}

/// A route value as carried by commands
pub type RouteSource = MaybeLazy<Arc<Route>>;

/// Target of a not-found or error declaration
#[derive(Debug, Clone)]
pub enum Fallback {
    /// Rendered like a page, with the failing status
    Route(RouteSource),
    /// Called with the failing request's context
    Middleware(Middleware),
}

impl From<Route> for Fallback {
    fn from(route: Route) -> Self {
        Fallback::Route(route.into())
    }
}

impl From<Middleware> for Fallback {
    fn from(middleware: Middleware) -> Self {
        Fallback::Middleware(middleware)
    }
}

type CommandThunk = dyn FnOnce() -> anyhow::Result<Vec<Command>> + Send;

/// Deferred producer of a nested command list
pub struct FsItems(Box<CommandThunk>);

impl FsItems {
    pub fn new<F>(items: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Vec<Command>> + Send + 'static,
    {
        Self(Box::new(items))
    }

    pub fn expand(self) -> anyhow::Result<Vec<Command>> {
        (self.0)()
    }
}

impl fmt::Debug for FsItems {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FsItems")
    }
}

/// One declaration in a route tree
///
/// `include_last_segment` says whether the last component of `pattern`
/// names its own segment. Constructors set it to `true`.
#[derive(Debug)]
pub enum Command {
    Middleware {
        pattern: String,
        fns: Vec<MaybeLazy<Middleware>>,
        include_last_segment: bool,
    },
    Layout {
        pattern: String,
        component: Component,
        config: Option<LayoutConfig>,
        include_last_segment: bool,
    },
    App {
        component: Component,
    },
    Route {
        pattern: String,
        route: RouteSource,
        config: Option<RouteConfig>,
        include_last_segment: bool,
    },
    NotFound {
        pattern: String,
        target: Fallback,
        include_last_segment: bool,
    },
    Handler {
        pattern: String,
        method: Methods,
        fns: Vec<MaybeLazy<Middleware>>,
        include_last_segment: bool,
    },
    Error {
        pattern: String,
        route: Fallback,
        include_last_segment: bool,
    },
    FsRoute {
        pattern: String,
        items: FsItems,
        include_last_segment: bool,
    },
}

impl Command {
    pub fn middleware<I, M>(pattern: impl Into<String>, fns: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MaybeLazy<Middleware>>,
    {
        Command::Middleware {
            pattern: pattern.into(),
            fns: fns.into_iter().map(Into::into).collect(),
            include_last_segment: true,
        }
    }

    pub fn layout(pattern: impl Into<String>, component: Component) -> Self {
        Command::Layout {
            pattern: pattern.into(),
            component,
            config: None,
            include_last_segment: true,
        }
    }

    pub fn app(component: Component) -> Self {
        Command::App { component }
    }

    pub fn route(pattern: impl Into<String>, route: impl Into<RouteSource>) -> Self {
        Command::Route {
            pattern: pattern.into(),
            route: route.into(),
            config: None,
            include_last_segment: true,
        }
    }

    /// A route whose definition is loaded by the first request that needs it
    pub fn lazy_route<F, Fut>(pattern: impl Into<String>, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Route>> + Send + 'static,
    {
        let lazy = Lazy::new(move || {
            let load = loader();
            async move { load.await.map(Arc::new) }
        });
        Command::route(pattern, lazy)
    }

    pub fn not_found(target: impl Into<Fallback>) -> Self {
        Command::NotFound {
            pattern: "/".to_string(),
            target: target.into(),
            include_last_segment: true,
        }
    }

    pub fn handler<I, M>(pattern: impl Into<String>, method: impl Into<Methods>, fns: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MaybeLazy<Middleware>>,
    {
        Command::Handler {
            pattern: pattern.into(),
            method: method.into(),
            fns: fns.into_iter().map(Into::into).collect(),
            include_last_segment: true,
        }
    }

    pub fn error(pattern: impl Into<String>, route: impl Into<Fallback>) -> Self {
        Command::Error {
            pattern: pattern.into(),
            route: route.into(),
            include_last_segment: true,
        }
    }

    pub fn fs_route<F>(pattern: impl Into<String>, items: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Vec<Command>> + Send + 'static,
    {
        Command::FsRoute {
            pattern: pattern.into(),
            items: FsItems::new(items),
            include_last_segment: true,
        }
    }

    /// Sets whether the last pattern component names its own segment
    ///
    /// No effect on `App`, which always targets the root.
    pub fn with_include_last_segment(mut self, include: bool) -> Self {
        match &mut self {
            Command::Middleware {
                include_last_segment,
                ..
            }
            | Command::Layout {
                include_last_segment,
                ..
            }
            | Command::Route {
                include_last_segment,
                ..
            }
            | Command::NotFound {
                include_last_segment,
                ..
            }
            | Command::Handler {
                include_last_segment,
                ..
            }
            | Command::Error {
                include_last_segment,
                ..
            }
            | Command::FsRoute {
                include_last_segment,
                ..
            } => *include_last_segment = include,
            Command::App { .. } => {}
        }
        self
    }

    /// Attaches a route config; no effect on other commands
    pub fn with_route_config(mut self, route_config: RouteConfig) -> Self {
        if let Command::Route { config, .. } = &mut self {
            *config = Some(route_config);
        }
        self
    }

    /// Attaches a layout config; no effect on other commands
    pub fn with_layout_config(mut self, layout_config: LayoutConfig) -> Self {
        if let Command::Layout { config, .. } = &mut self {
            *config = Some(layout_config);
        }
        self
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Middleware { .. } => "middleware",
            Command::Layout { .. } => "layout",
            Command::App { .. } => "app",
            Command::Route { .. } => "route",
            Command::NotFound { .. } => "not_found",
            Command::Handler { .. } => "handler",
            Command::Error { .. } => "error",
            Command::FsRoute { .. } => "fs_route",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_lazy_loads_once_under_concurrency() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Lazy::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(42_u32)
            }
        });

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let lazy = lazy.clone();
                tokio::spawn(async move { *lazy.get().await.unwrap() })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lazy_failure_is_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Lazy::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    anyhow::bail!("not yet");
                }
                Ok("ready")
            }
        });

        assert!(lazy.get().await.is_err());
        assert!(!lazy.is_loaded());
        assert_eq!(*lazy.get().await.unwrap(), "ready");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_maybe_lazy_resolve() {
        let ready: MaybeLazy<u8> = 7.into();
        assert_eq!(ready.resolve().await.unwrap(), 7);

        let lazy: MaybeLazy<u8> = Lazy::new(|| async { Ok(9) }).into();
        assert_eq!(lazy.resolve().await.unwrap(), 9);
    }

    #[test]
    fn test_include_last_segment_default_and_override() {
        let command = Command::middleware("/a", Vec::<Middleware>::new());
        assert!(matches!(
            command,
            Command::Middleware {
                include_last_segment: true,
                ..
            }
        ));

        let command = command.with_include_last_segment(false);
        assert!(matches!(
            command,
            Command::Middleware {
                include_last_segment: false,
                ..
            }
        ));
    }

    #[test]
    fn test_fs_route_expands() {
        let command = Command::fs_route("/", || Ok(vec![Command::route("/a", Route::new())]));
        let Command::FsRoute { items, .. } = command else {
            panic!("expected fs route");
        };
        let nested = items.expand().unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].kind(), "route");
    }
}

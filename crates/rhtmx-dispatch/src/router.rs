//! Two-tier path matcher
//!
//! Pathnames without template syntax live in a hash map and match by exact
//! lookup. Templates are compiled to [`PathTemplate`]s and kept in a list that
//! is scanned in registration order, so the first registered template that
//! matches wins. Static entries always win over templates.
//!
//! The router is built once and then only read: [`Router::match_route`] takes
//! `&self` and mutates nothing.

use std::collections::{BTreeSet, HashMap};

use crate::error::PatternError;
use crate::method::{Method, RouteByMethod};
use crate::route::pattern::{is_template, PathTemplate};

/// Outcome of matching one request
#[derive(Debug, Clone)]
pub struct RouteResult<T> {
    /// Decoded path parameters
    pub params: HashMap<String, String>,
    /// Seed entries followed by every chain registered for the method
    pub handlers: Vec<T>,
    /// Whether the method had at least one chain
    pub method_match: bool,
    /// Pattern that matched the pathname, regardless of method
    pub pattern: Option<String>,
}

#[derive(Debug)]
struct DynamicRoute<T> {
    template: PathTemplate,
    by_method: RouteByMethod<T>,
}

/// Path matcher over per-method handler chains
///
/// # Examples
///
/// ```
/// use rhtmx_dispatch::{Method, Router};
///
/// let mut router = Router::new();
/// router.add(Method::Get, "/users/:id", vec!["show_user"]).unwrap();
///
/// let result = router.match_route(Method::Get, "/users/42", Vec::new());
/// assert!(result.method_match);
/// assert_eq!(result.handlers, vec!["show_user"]);
/// assert_eq!(result.params["id"], "42");
/// ```
#[derive(Debug)]
pub struct Router<T> {
    static_routes: HashMap<String, RouteByMethod<T>>,
    dynamic_routes: Vec<DynamicRoute<T>>,
    /// Pattern → position in `dynamic_routes`
    dynamic_index: HashMap<String, usize>,
    /// Pattern → every method ever registered for it
    allowed: HashMap<String, BTreeSet<Method>>,
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self {
            static_routes: HashMap::new(),
            dynamic_routes: Vec::new(),
            dynamic_index: HashMap::new(),
            allowed: HashMap::new(),
        }
    }

    /// Appends a handler chain for `method` at `pathname`
    ///
    /// # Errors
    ///
    /// Fails when `pathname` is a template that does not compile.
    pub fn add(&mut self, method: Method, pathname: &str, handlers: Vec<T>) -> Result<(), PatternError> {
        tracing::trace!("Registering {} {}", method, pathname);

        if !is_template(pathname) {
            self.static_routes
                .entry(pathname.to_string())
                .or_default()
                .push(method, handlers);
            self.allow(method, pathname);
            return Ok(());
        }

        let idx = match self.dynamic_index.get(pathname) {
            Some(&idx) => idx,
            None => {
                let template = PathTemplate::compile(pathname)?;
                self.dynamic_routes.push(DynamicRoute {
                    template,
                    by_method: RouteByMethod::new(),
                });
                let idx = self.dynamic_routes.len() - 1;
                self.dynamic_index.insert(pathname.to_string(), idx);
                idx
            }
        };
        self.dynamic_routes[idx].by_method.push(method, handlers);
        self.allow(method, pathname);
        Ok(())
    }

    fn allow(&mut self, method: Method, pathname: &str) {
        self.allowed
            .entry(pathname.to_string())
            .or_default()
            .insert(method);
    }

    /// Methods registered for `pattern`, in canonical order
    pub fn allowed_methods(&self, pattern: &str) -> Vec<Method> {
        self.allowed
            .get(pattern)
            .map(|methods| methods.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl<T: Clone> Router<T> {
    /// Matches `method` and `pathname`, appending the matched chains to `seed`
    ///
    /// A static entry is looked up first. Otherwise templates are tried in
    /// registration order and the first match decides the pattern, even when
    /// it has nothing registered for `method`. `HEAD` falls back to `GET`
    /// when it has no chains of its own.
    pub fn match_route(&self, method: Method, pathname: &str, seed: Vec<T>) -> RouteResult<T> {
        let mut result = RouteResult {
            params: HashMap::new(),
            handlers: seed,
            method_match: false,
            pattern: None,
        };

        if let Some(by_method) = self.static_routes.get(pathname) {
            result.pattern = Some(pathname.to_string());
            collect_chains(by_method.lookup(method), &mut result);
            return result;
        }

        let matched = self.dynamic_routes.iter().find_map(|route| {
            route
                .template
                .matches(pathname)
                .map(|params| (route, params))
        });

        if let Some((route, params)) = matched {
            result.pattern = Some(route.template.pattern().to_string());
            result.params = params;
            collect_chains(route.by_method.lookup(method), &mut result);
        }

        result
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_chains<T: Clone>(chains: &[Vec<T>], result: &mut RouteResult<T>) {
    if chains.is_empty() {
        return;
    }
    result.method_match = true;
    for chain in chains {
        result.handlers.extend(chain.iter().cloned());
    }
}

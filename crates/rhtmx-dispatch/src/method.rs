//! HTTP methods the router dispatches on
//!
//! Seven methods are supported. `RouteByMethod` keeps one slot per method so
//! lookups are an array index rather than a hash probe.

use std::fmt;
use std::str::FromStr;

use crate::error::UnknownMethod;

/// Supported HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl Method {
    /// Every supported method, in canonical order
    pub const ALL: [Method; 7] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Patch,
        Method::Delete,
        Method::Options,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl TryFrom<&axum::http::Method> for Method {
    type Error = UnknownMethod;

    fn try_from(method: &axum::http::Method) -> Result<Self, Self::Error> {
        method.as_str().parse()
    }
}

/// Which methods a registration covers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Methods {
    /// All seven methods
    #[default]
    All,
    /// Exactly these methods
    Only(Vec<Method>),
}

impl Methods {
    pub fn one(method: Method) -> Self {
        Methods::Only(vec![method])
    }

    /// Methods covered, in declaration order (canonical order for `All`)
    pub fn to_vec(&self) -> Vec<Method> {
        match self {
            Methods::All => Method::ALL.to_vec(),
            Methods::Only(list) => list.clone(),
        }
    }
}

impl From<Method> for Methods {
    fn from(method: Method) -> Self {
        Methods::one(method)
    }
}

/// Per-method lists of handler chains
///
/// Each registration appends one chain; a method nobody registered stays empty.
#[derive(Debug, Clone)]
pub struct RouteByMethod<T> {
    slots: [Vec<Vec<T>>; 7],
}

impl<T> RouteByMethod<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub fn get(&self, method: Method) -> &[Vec<T>] {
        &self.slots[method.slot()]
    }

    pub fn push(&mut self, method: Method, handlers: Vec<T>) {
        self.slots[method.slot()].push(handlers);
    }

    /// Chains for `method`, with `HEAD` mirroring `GET` when it has none of its own
    pub fn lookup(&self, method: Method) -> &[Vec<T>] {
        let chains = self.get(method);
        if method == Method::Head && chains.is_empty() {
            self.get(Method::Get)
        } else {
            chains
        }
    }
}

impl<T> Default for RouteByMethod<T> {
    fn default() -> Self {
        Self::new()
    }
}

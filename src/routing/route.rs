//! Route definitions and the route table.
//!
//! # Responsibilities
//! - Hold named method + pattern + handler bindings in registration order
//! - Validate the table before it is compiled
//!
//! # Design Decisions
//! - The table is an owned value, not process-wide state; the composition
//!   root (or the server owning it) is the only writer
//! - Compiling borrows the table, so it cannot change while a router is built
//! - Seeded with the built-in health route

use std::collections::{HashMap, HashSet};
use std::fmt;

use axum::{handler::Handler, http::Method, routing::MethodFilter};

use super::{matcher, router, RouterError, METRICS_PATH};
use crate::health;
use crate::http::{boxed, HttpHandler};

/// A named binding of HTTP methods and a path pattern to a handler.
#[derive(Clone)]
pub struct Route {
    /// Route name used for request logging.
    pub name: String,

    /// HTTP methods allowed for this route.
    pub methods: Vec<Method>,

    /// URI path pattern; dynamic segments use `{name}`, e.g. `/user/{name}`.
    pub pattern: String,

    /// A deprecated route stays registered but answers `403`.
    pub deprecated: bool,

    handler: HttpHandler,
}

impl Route {
    /// Create a route from any axum handler.
    pub fn new<H, T>(
        name: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
        pattern: impl Into<String>,
        handler: H,
    ) -> Self
    where
        H: Handler<T, ()> + Sync,
        T: 'static,
    {
        Self::from_service(name, methods, pattern, boxed(handler.with_state(())))
    }

    /// Create a route from an already erased handler.
    pub fn from_service(
        name: impl Into<String>,
        methods: impl IntoIterator<Item = Method>,
        pattern: impl Into<String>,
        handler: HttpHandler,
    ) -> Self {
        Self {
            name: name.into(),
            methods: methods.into_iter().collect(),
            pattern: pattern.into(),
            deprecated: false,
            handler,
        }
    }

    /// Flag the route as deprecated.
    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    pub fn handler(&self) -> &HttpHandler {
        &self.handler
    }

    /// Methods combined into a single filter.
    pub(crate) fn method_filter(&self) -> Result<MethodFilter, RouterError> {
        let mut filter: Option<MethodFilter> = None;
        for method in &self.methods {
            let next = MethodFilter::try_from(method.clone()).map_err(|_| {
                RouterError::UnsupportedMethod {
                    name: self.name.clone(),
                    method: method.clone(),
                }
            })?;
            filter = Some(match filter {
                Some(current) => current.or(next),
                None => next,
            });
        }

        filter.ok_or_else(|| RouterError::NoMethods {
            name: self.name.clone(),
        })
    }

    /// Methods as `[GET POST]`, the form used in registration logs.
    pub(crate) fn methods_display(&self) -> String {
        let methods: Vec<&str> = self.methods.iter().map(Method::as_str).collect();
        format!("[{}]", methods.join(" "))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("pattern", &self.pattern)
            .field("deprecated", &self.deprecated)
            .finish_non_exhaustive()
    }
}

/// Ordered collection of routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create a table seeded with the health route.
    pub fn new() -> Self {
        Self {
            routes: vec![health::route()],
        }
    }

    /// Create a table without any routes.
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    /// Append a route.
    pub fn push(&mut self, route: Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    /// Look up a route by name.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Compile into a dispatchable router. See [`router::compile`].
    pub fn compile(&self, strict_slash: bool) -> Result<axum::Router, RouterError> {
        router::compile(self, strict_slash)
    }

    /// Check every route and reject collisions.
    ///
    /// Routes on the same pattern may coexist as long as their methods do
    /// not overlap. Patterns putting different captures at the same position
    /// cannot coexist at all.
    pub fn validate(&self) -> Result<(), RouterError> {
        let mut names: HashSet<&str> = HashSet::new();
        let mut seen: Vec<&Route> = Vec::with_capacity(self.routes.len());
        let mut claimed: HashMap<(String, Method), &str> = HashMap::new();
        claimed.insert((METRICS_PATH.to_string(), Method::GET), "metrics");

        for route in &self.routes {
            route.method_filter()?;

            matcher::validate(&route.pattern).map_err(|issue| RouterError::MalformedPattern {
                name: route.name.clone(),
                pattern: route.pattern.clone(),
                issue,
            })?;

            if !names.insert(route.name.as_str()) {
                return Err(RouterError::DuplicateName(route.name.clone()));
            }

            if let Some(existing) = seen
                .iter()
                .find(|other| matcher::captures_disagree(&other.pattern, &route.pattern))
            {
                return Err(RouterError::AmbiguousPattern {
                    name: route.name.clone(),
                    pattern: route.pattern.clone(),
                    existing: existing.name.clone(),
                    existing_pattern: existing.pattern.clone(),
                });
            }
            seen.push(route);

            let shape = matcher::shape(&route.pattern);

            for method in &route.methods {
                if let Some(existing) = claimed.insert((shape.clone(), method.clone()), &route.name) {
                    if existing != route.name {
                        return Err(RouterError::Conflict {
                            name: route.name.clone(),
                            existing: existing.to_string(),
                            method: method.clone(),
                            pattern: route.pattern.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Extend<Route> for RouteTable {
    fn extend<I: IntoIterator<Item = Route>>(&mut self, iter: I) {
        self.routes.extend(iter);
    }
}

impl FromIterator<Route> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self {
            routes: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

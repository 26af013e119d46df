//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the route for a verb and path
//! - Report not-found and method-not-allowed as distinct outcomes
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in registration order; first match wins, no specificity scoring
//! - Explicit NoMatch outcomes rather than silent defaults

use std::fmt;

use crate::routing::descriptor::RouteDescriptor;
use crate::routing::pattern::PathParams;
use crate::routing::verb::{Verb, VerbSet};

/// A descriptor paired with whatever the caller dispatches to.
#[derive(Debug)]
pub struct Route<H> {
    pub descriptor: RouteDescriptor,
    pub handler: H,
}

/// A successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H> {
    pub route: &'a Route<H>,
    /// Captured parameters with declared defaults applied.
    pub params: PathParams,
}

/// Outcome of a table lookup.
#[derive(Debug)]
pub enum Lookup<'a, H> {
    Found(RouteMatch<'a, H>),
    /// The path matched at least one pattern but none accepts the verb.
    MethodNotAllowed { allowed: VerbSet },
    NotFound,
}

/// Dispatch table indexed by pattern and verb.
pub struct RouteTable<H> {
    routes: Vec<Route<H>>,
}

impl<H> RouteTable<H> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Build a table from routes in registration order.
    pub fn from_routes(routes: impl IntoIterator<Item = Route<H>>) -> Self {
        let mut table = Self::new();
        for route in routes {
            table.register(route);
        }
        table
    }

    /// Append a route. Earlier registrations take precedence.
    pub fn register(&mut self, route: Route<H>) {
        tracing::debug!(
            pattern = %route.descriptor.pattern(),
            verbs = %route.descriptor.verbs(),
            action = %route.descriptor.target(),
            "Route registered"
        );
        self.routes.push(route);
    }

    /// Find the route for a request.
    ///
    /// `verb` is `None` for request methods outside the canonical set, which
    /// can therefore only ever produce `MethodNotAllowed` or `NotFound`.
    pub fn lookup(&self, verb: Option<Verb>, path: &str) -> Lookup<'_, H> {
        let mut allowed = VerbSet::empty();
        let mut path_matched = false;

        for route in &self.routes {
            let Some(params) = route.descriptor.pattern().matches(path) else {
                continue;
            };
            path_matched = true;

            match verb {
                Some(v) if route.descriptor.verbs().contains(v) => {
                    return Lookup::Found(RouteMatch {
                        route,
                        params: route.descriptor.with_defaults(params),
                    });
                }
                _ => allowed = allowed.union(route.descriptor.verbs()),
            }
        }

        if path_matched {
            Lookup::MethodNotAllowed { allowed }
        } else {
            Lookup::NotFound
        }
    }

    /// Registered descriptors, in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.routes.iter().map(|r| &r.descriptor)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<H> Default for RouteTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> fmt::Debug for RouteTable<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.descriptors()).finish()
    }
}

//! Request middleware chain.
//!
//! # Data Flow
//! ```text
//! request
//!     → ErrorBoundary            (always outermost, catches Err and panics)
//!     → middleware[0] → middleware[1] → ... → middleware[n-1]
//!     → Endpoint                 (route lookup + controller invocation)
//! response travels back in reverse order
//! ```
//!
//! # Design Decisions
//! - Order is fixed at startup; a middleware may short-circuit by returning
//!   without calling `next`
//! - Middleware are resolved from the container once and shared by all
//!   requests
//! - The error boundary is not a list entry: nothing can be placed outside it

pub mod access_log;
pub mod error_boundary;
pub mod session;

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use futures_util::future::BoxFuture;

use crate::container::{Container, Injectable, ResolveError};
use crate::error::{DispatchError, StartupError};

pub use access_log::AccessLog;
pub use error_boundary::{ErrorBoundary, ErrorFormat};
pub use session::SessionCookie;

/// Outcome of a middleware or endpoint.
pub type DispatchResult = Result<Response, DispatchError>;

/// A request-processing stage.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs and startup errors.
    fn name(&self) -> &'static str;

    /// Process `request`, usually by calling `next.run(request)`.
    fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, DispatchResult>;
}

/// The innermost handler of a chain.
pub trait Endpoint: Send + Sync {
    fn call(&self, request: Request<Body>) -> BoxFuture<'_, DispatchResult>;
}

/// The remainder of the chain after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    endpoint: &'a dyn Endpoint,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>], endpoint: &'a dyn Endpoint) -> Self {
        Self {
            middleware,
            endpoint,
        }
    }

    /// Pass the request to the next stage.
    pub fn run(self, request: Request<Body>) -> BoxFuture<'a, DispatchResult> {
        match self.middleware.split_first() {
            Some((current, rest)) => current.handle(
                request,
                Next {
                    middleware: rest,
                    endpoint: self.endpoint,
                },
            ),
            None => self.endpoint.call(request),
        }
    }
}

/// Error boundary plus the ordered middleware it wraps.
pub struct MiddlewareChain {
    boundary: ErrorBoundary,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new(boundary: ErrorBoundary) -> Self {
        Self {
            boundary,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware inside the ones already added.
    pub fn with(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Resolve every entry of `set` from `container`, in order.
    pub fn build(
        set: &MiddlewareSet,
        container: &Container,
        boundary: ErrorBoundary,
    ) -> Result<Self, StartupError> {
        let mut chain = Self::new(boundary);
        for entry in &set.entries {
            let middleware = (entry.resolve)(container).map_err(|source| StartupError::Middleware {
                name: entry.name,
                source,
            })?;
            chain = chain.with(middleware);
        }
        Ok(chain)
    }

    /// Run `request` through the chain into `endpoint`. Never fails: errors
    /// become rendered error responses.
    pub async fn dispatch(&self, request: Request<Body>, endpoint: &dyn Endpoint) -> Response {
        self.boundary
            .wrap(request, Next::new(&self.middleware, endpoint))
            .await
    }

    /// Middleware names, outermost first.
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("boundary", &self.boundary)
            .field("middleware", &self.names())
            .finish()
    }
}

struct MiddlewareEntry {
    name: &'static str,
    bind: fn(&mut Container),
    resolve: fn(&Container) -> Result<Arc<dyn Middleware>, ResolveError>,
}

/// Ordered middleware declarations, resolved from the container at startup.
#[derive(Default)]
pub struct MiddlewareSet {
    entries: Vec<MiddlewareEntry>,
}

impl MiddlewareSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `M`. Earlier entries run outside later ones.
    pub fn add<M: Middleware + Injectable>(mut self) -> Self {
        self.entries.push(MiddlewareEntry {
            name: std::any::type_name::<M>(),
            bind: bind::<M>,
            resolve: resolve::<M>,
        });
        self
    }

    /// Bind every middleware not already bound, as an autowired singleton.
    pub fn bind_all(&self, container: &mut Container) {
        for entry in &self.entries {
            (entry.bind)(container);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for MiddlewareSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.name))
            .finish()
    }
}

fn bind<M: Middleware + Injectable>(container: &mut Container) {
    if !container.contains::<M>() {
        container.autowire_singleton::<M>();
    }
}

fn resolve<M: Middleware + Injectable>(container: &Container) -> Result<Arc<dyn Middleware>, ResolveError> {
    container.resolve::<M>().map(|m| m as Arc<dyn Middleware>)
}

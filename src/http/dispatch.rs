//! Dispatch endpoint: the innermost stage of the middleware chain.
//!
//! # Data Flow
//! ```text
//! (method, path)
//!     → RouteTable::lookup
//!         NotFound          → 404
//!         MethodNotAllowed  → 405 + Allow
//!         Found             → ActionContext::from_request
//!                           → ActionHandler::invoke (fresh controller)
//!                           → action future
//! ```
//!
//! Errors are returned untouched to the chain; only the error boundary turns
//! them into responses.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::container::Container;
use crate::controller::{ActionContext, ActionHandler};
use crate::error::DispatchError;
use crate::middleware::{DispatchResult, Endpoint};
use crate::routing::{Lookup, RouteDescriptor, RouteTable, Verb, VerbSet};

/// Routes a request to its controller action.
pub struct Dispatcher {
    table: RouteTable<Arc<dyn ActionHandler>>,
    container: Arc<Container>,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(
        table: RouteTable<Arc<dyn ActionHandler>>,
        container: Arc<Container>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            table,
            container,
            max_body_bytes,
        }
    }

    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.table.descriptors()
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    async fn dispatch(&self, request: Request<Body>) -> DispatchResult {
        let verb = Verb::from_method(request.method());
        let path = request.uri().path().to_string();

        let matched = match self.table.lookup(verb, &path) {
            Lookup::Found(matched) => matched,
            Lookup::NotFound => {
                tracing::debug!(method = %request.method(), path = %path, "No route matched");
                return Ok(not_found());
            }
            Lookup::MethodNotAllowed { allowed } => {
                tracing::debug!(method = %request.method(), path = %path, allowed = %allowed, "Method not allowed");
                return Ok(method_not_allowed(allowed));
            }
        };

        let descriptor = &matched.route.descriptor;
        tracing::debug!(action = %descriptor.target(), path = %path, "Dispatching");

        let cx = ActionContext::from_request(request, matched.params, self.max_body_bytes).await?;
        let action = matched.route.handler.invoke(&self.container, cx)?;
        action.await.map_err(|source| DispatchError::Action {
            target: descriptor.target(),
            source,
        })
    }
}

impl Endpoint for Dispatcher {
    fn call(&self, request: Request<Body>) -> BoxFuture<'_, DispatchResult> {
        self.dispatch(request).boxed()
    }
}

fn plain(status: StatusCode, body: &'static str) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

fn not_found() -> Response {
    plain(StatusCode::NOT_FOUND, "Not Found")
}

fn method_not_allowed(allowed: VerbSet) -> Response {
    let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    if let Ok(value) = HeaderValue::from_str(&allowed.to_string()) {
        response.headers_mut().insert(ALLOW, value);
    }
    response
}

//! Startup orchestration.
//!
//! # Responsibilities
//! - Register configuration sections and shared services in the container
//! - Discover routes from the registered controllers
//! - Resolve the middleware chain
//! - Freeze everything into an immutable `Application`
//!
//! # Design Decisions
//! - Fail fast: invalid routing metadata or unresolvable middleware abort
//!   startup before any traffic is accepted
//! - Explicit bindings made through `container_mut` win over the defaults
//!   (controllers transient, middleware singleton)

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::config::AppConfig;
use crate::container::Container;
use crate::controller::ControllerSet;
use crate::error::StartupError;
use crate::http::Dispatcher;
use crate::middleware::{ErrorBoundary, MiddlewareChain, MiddlewareSet};
use crate::routing::{discover, RouteDescriptor, RouteTable};
use crate::services::{SessionStore, Templates};

/// Builder for an [`Application`].
pub struct Bootstrap {
    config: AppConfig,
    container: Container,
    controllers: ControllerSet,
    middleware: MiddlewareSet,
}

impl Bootstrap {
    /// Start from `config` with its sections and the shared services bound.
    pub fn new(config: AppConfig) -> Self {
        let mut container = Container::new();
        container
            .instance(config.clone())
            .instance(config.http.clone())
            .instance(config.app.clone())
            .instance(config.templates.clone())
            .instance(config.session.clone())
            .autowire_singleton::<Templates>()
            .autowire_singleton::<SessionStore>();

        Self {
            config,
            container,
            controllers: ControllerSet::new(),
            middleware: MiddlewareSet::new(),
        }
    }

    /// Add or replace bindings before the application is built.
    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn controllers(mut self, controllers: ControllerSet) -> Self {
        self.controllers = controllers;
        self
    }

    /// Middleware in order, outermost first. The error boundary always
    /// wraps all of them.
    pub fn middleware(mut self, middleware: MiddlewareSet) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn build(self) -> Result<Application, StartupError> {
        let Bootstrap {
            config,
            mut container,
            controllers,
            middleware,
        } = self;

        let routes = discover(&controllers)?;
        controllers.bind_all(&mut container);
        middleware.bind_all(&mut container);
        let container = Arc::new(container);

        let chain = MiddlewareChain::build(&middleware, &container, ErrorBoundary::new(config.app.debug))?;
        let dispatcher = Dispatcher::new(
            RouteTable::from_routes(routes),
            Arc::clone(&container),
            config.http.max_body_bytes,
        );

        tracing::info!(
            controllers = ?controllers.names(),
            routes = dispatcher.routes().count(),
            middleware = ?chain.names(),
            debug = config.app.debug,
            "Application ready"
        );

        Ok(Application {
            config,
            chain,
            dispatcher,
        })
    }
}

/// A fully wired application: dispatch table, container and middleware.
///
/// Immutable once built; share it behind an `Arc`.
pub struct Application {
    config: AppConfig,
    chain: MiddlewareChain,
    dispatcher: Dispatcher,
}

impl Application {
    /// Run one request through the middleware chain and the dispatch table.
    pub async fn handle(&self, request: Request<Body>) -> Response {
        self.chain.dispatch(request, &self.dispatcher).await
    }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &RouteDescriptor> {
        self.dispatcher.routes()
    }

    pub fn container(&self) -> &Container {
        self.dispatcher.container()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Middleware names, outermost first (the error boundary excluded).
    pub fn middleware(&self) -> Vec<&'static str> {
        self.chain.names()
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("routes", &self.routes().map(|r| r.target()).collect::<Vec<_>>())
            .field("middleware", &self.chain)
            .finish_non_exhaustive()
    }
}

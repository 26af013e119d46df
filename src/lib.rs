//! Declarative route registration and request dispatch.
//!
//! Controllers declare their actions and url attributes; startup discovery
//! compiles them into a dispatch table, the container builds a fresh
//! controller for every request, and a middleware chain wrapped in an error
//! boundary turns every failure into a rendered 500.

pub mod app;
pub mod config;
pub mod container;
pub mod controller;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;
pub mod services;

pub use config::AppConfig;
pub use container::{Container, Injectable, ResolveError, Resolver};
pub use controller::{Action, ActionContext, ActionResult, Controller, ControllerSet, Reply};
pub use error::{BoxError, DispatchError, StartupError};
pub use http::HttpServer;
pub use lifecycle::{Application, Bootstrap, Shutdown, ShutdownListener};
pub use middleware::{Middleware, MiddlewareSet, Next};
pub use routing::UrlAttribute;

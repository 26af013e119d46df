//! Error taxonomy.
//!
//! ```text
//! StartupError   invalid routing metadata, config, middleware wiring → abort start
//! DispatchError  container, body, controller, panic → error boundary → 500
//! ```
//!
//! Not-found and method-not-allowed are routing outcomes, not errors.

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::container::ResolveError;
use crate::routing::RouteError;

/// Error type returned by controller actions and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors raised before the server accepts traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid route on `{controller}::{action}`: {source}")]
    Route {
        controller: &'static str,
        action: &'static str,
        #[source]
        source: RouteError,
    },

    #[error("failed to build middleware `{name}`: {source}")]
    Middleware {
        name: &'static str,
        #[source]
        source: ResolveError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("metrics exporter: {0}")]
    Metrics(String),
}

/// A failure raised while dispatching one request.
///
/// Every variant ends up at the error boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The container could not build the controller or one of its dependencies.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The request body could not be read or parsed.
    #[error("request body rejected: {source}")]
    Body {
        #[source]
        source: BoxError,
    },

    /// A controller action returned an error.
    #[error("{target} failed: {source}")]
    Action {
        target: String,
        #[source]
        source: BoxError,
    },

    /// A middleware returned an error of its own.
    #[error("middleware `{name}` failed: {source}")]
    Middleware {
        name: &'static str,
        #[source]
        source: BoxError,
    },

    /// Something further down the chain panicked.
    #[error("request handler panicked: {message}")]
    Panic { message: String },
}

impl DispatchError {
    pub fn body(source: impl Into<BoxError>) -> Self {
        DispatchError::Body {
            source: source.into(),
        }
    }

    /// Short label used in error renderings and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Resolve(_) => "ResolveError",
            DispatchError::Body { .. } => "BodyError",
            DispatchError::Action { .. } => "ControllerError",
            DispatchError::Middleware { .. } => "MiddlewareError",
            DispatchError::Panic { .. } => "Panic",
        }
    }

    /// Messages of the underlying causes, outermost first, excluding `self`.
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            causes.push(err.to_string());
            current = err.source();
        }
        causes
    }
}

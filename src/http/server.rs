//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Mount the application as the Axum router fallback
//! - Wire up tower-http layers (request ID, tracing, timeout)
//! - Align axum's extractor body limit with `http.max_body_bytes`
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, State},
    http::Request,
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::ShutdownListener;
use crate::lifecycle::Application;

/// HTTP front end for an [`Application`].
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(app: Arc<Application>) -> Self {
        let timeout = Duration::from_secs(app.config().http.request_timeout_secs);
        let max_body_bytes = app.config().http.max_body_bytes;
        Self {
            router: Self::build_router(app, timeout, max_body_bytes),
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers listed first run outermost: the request ID is assigned before
    /// the trace span opens, so every log line of the request carries it.
    #[allow(deprecated)]
    fn build_router(app: Arc<Application>, timeout: Duration, max_body_bytes: usize) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(app)
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(timeout)),
            )
    }

    /// The fully layered router, for in-process use.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until Ctrl+C or until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownListener,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(app): State<Arc<Application>>, request: Request<Body>) -> Response {
    app.handle(request).await
}

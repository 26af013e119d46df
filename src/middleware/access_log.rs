//! Access log middleware.
//!
//! One structured log line and one metrics sample per request that reaches
//! it. Failures are logged here at `warn` and rendered by the boundary.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use super::{DispatchResult, Middleware, Next};
use crate::container::{Injectable, ResolveError, Resolver};
use crate::observability::metrics;

#[derive(Debug, Clone, Default)]
pub struct AccessLog;

impl Injectable for AccessLog {
    fn inject(_: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(AccessLog)
    }
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access-log"
    }

    fn handle<'a>(&'a self, request: Request<Body>, next: Next<'a>) -> BoxFuture<'a, DispatchResult> {
        async move {
            let start = Instant::now();
            let method = request.method().clone();
            let path = request.uri().path().to_string();
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown")
                .to_string();

            let result = next.run(request).await;

            match &result {
                Ok(response) => {
                    let status = response.status();
                    tracing::info!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        status = status.as_u16(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Request completed"
                    );
                    metrics::record_request(&method, status.as_u16(), start);
                }
                Err(error) => {
                    tracing::warn!(
                        request_id = %request_id,
                        method = %method,
                        path = %path,
                        kind = error.kind(),
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Request failed"
                    );
                    metrics::record_request(&method, StatusCode::INTERNAL_SERVER_ERROR.as_u16(), start);
                }
            }
            result
        }
        .boxed()
    }
}

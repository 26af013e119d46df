//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceExt;

use web_scaffold::config::AppConfig;
use web_scaffold::{app, Application, HttpServer, Shutdown};

/// Defaults with templates taken from the repository.
pub fn demo_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.templates.directory = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
    config.templates.strict_variables = true;
    config
}

pub fn demo_app(config: AppConfig) -> Arc<Application> {
    Arc::new(app::build(config).unwrap())
}

/// The demo application behind the full HTTP layer stack.
pub fn demo_router() -> Router {
    router(demo_app(demo_config()))
}

pub fn router(app: Arc<Application>) -> Router {
    HttpServer::new(app).into_router()
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the first `Set-Cookie` header.
    pub fn cookie(&self) -> Option<String> {
        self.header("set-cookie")
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(router: &Router, request: Request<Body>) -> TestResponse {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(router: &Router, uri: &str) -> TestResponse {
    send(router, Request::get(uri).body(Body::empty()).unwrap()).await
}

/// Serve `app` on an ephemeral port until the returned `Shutdown` fires.
pub async fn start_server(app: Arc<Application>) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let listener_handle = shutdown.listener();

    tokio::spawn(async move {
        HttpServer::new(app).run(listener, listener_handle).await.unwrap();
    });

    (addr, shutdown)
}

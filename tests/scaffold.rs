//! Dispatch behaviour with application-defined controllers and services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};

use web_scaffold::config::AppConfig;
use web_scaffold::routing::RouteError;
use web_scaffold::{
    Action, ActionContext, ActionResult, Bootstrap, Controller, ControllerSet, Injectable,
    ResolveError, Resolver, StartupError, UrlAttribute,
};

mod common;

static PROFILE_BUILDS: AtomicUsize = AtomicUsize::new(0);
static CLOCK_BUILDS: AtomicUsize = AtomicUsize::new(0);

/// Shared service: built once.
struct Clock {
    id: usize,
}

impl Injectable for Clock {
    fn inject(_: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            id: CLOCK_BUILDS.fetch_add(1, Ordering::SeqCst),
        })
    }
}

/// Controller: built per request.
struct Profile {
    id: usize,
    clock: Arc<Clock>,
}

impl Injectable for Profile {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            id: PROFILE_BUILDS.fetch_add(1, Ordering::SeqCst),
            clock: resolver.resolve()?,
        })
    }
}

impl Controller for Profile {
    const NAME: &'static str = "Profile";

    fn actions() -> Vec<Action<Self>> {
        vec![
            Action::new("show", Self::show).route(UrlAttribute::new("/profile[/{user}]").with_default("user", "me")),
            Action::new("update", Self::update).route(UrlAttribute::with_verbs("/profile", ["put", "Patch"])),
            Action::new("explode", Self::explode).route(UrlAttribute::new("/explode")),
        ]
    }
}

impl Profile {
    async fn show(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let data = serde_json::json!({
            "user": cx.arg("user"),
            "controller": self.id,
            "clock": self.clock.id,
        });
        Ok(cx.reply().cache_for(0).json(&data)?)
    }

    async fn update(self: Arc<Self>, cx: ActionContext) -> ActionResult {
        let name = cx.post_param("name").ok_or("missing name")?;
        Ok(cx.reply().json(&serde_json::json!({ "name": name, "method": cx.method().as_str() }))?)
    }

    async fn explode(self: Arc<Self>, _cx: ActionContext) -> ActionResult {
        let values: Vec<u8> = Vec::new();
        let index = values.len() + 3;
        Ok(axum::response::Response::new(Body::from(values[index].to_string())))
    }
}

/// Depends on itself.
struct Narcissus {
    _me: Arc<Narcissus>,
}

impl Injectable for Narcissus {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            _me: resolver.resolve()?,
        })
    }
}

impl Controller for Narcissus {
    const NAME: &'static str = "Narcissus";

    fn actions() -> Vec<Action<Self>> {
        vec![Action::new("mirror", |_: Arc<Self>, cx: ActionContext| async move {
            Ok(cx.reply().html("unreachable"))
        })
        .route(UrlAttribute::new("/mirror"))]
    }
}

struct Unregistered;

/// Depends on a type nothing binds.
struct Orphan {
    _missing: Arc<Unregistered>,
}

impl Injectable for Orphan {
    fn inject(resolver: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            _missing: resolver.resolve()?,
        })
    }
}

impl Controller for Orphan {
    const NAME: &'static str = "Orphan";

    fn actions() -> Vec<Action<Self>> {
        vec![Action::new("show", |_: Arc<Self>, cx: ActionContext| async move {
            Ok(cx.reply().html("unreachable"))
        })
        .route(UrlAttribute::new("/orphan"))]
    }
}

fn application(config: AppConfig) -> axum::Router {
    let mut bootstrap = Bootstrap::new(config).controllers(
        ControllerSet::new()
            .add::<Profile>()
            .add::<Narcissus>()
            .add::<Orphan>(),
    );
    bootstrap.container_mut().autowire_singleton::<Clock>();
    common::router(Arc::new(bootstrap.build().unwrap()))
}

fn json_request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("accept", "application/json");
    match body {
        Some(body) => builder
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[tokio::test]
async fn test_fresh_controller_per_request_with_shared_singleton() {
    let router = application(AppConfig::default());

    let first = common::send(&router, json_request("GET", "/profile", None)).await.json();
    let second = common::send(&router, json_request("GET", "/profile/ada", None)).await.json();

    assert_eq!(first["user"], "me");
    assert_eq!(second["user"], "ada");
    assert_ne!(first["controller"], second["controller"]);
    assert_eq!(first["clock"], second["clock"]);
}

#[tokio::test]
async fn test_verbs_are_case_normalized() {
    let router = application(AppConfig::default());

    let response = common::send(&router, json_request("PATCH", "/profile", Some("name=ada&_METHOD=PUT"))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["method"], "PATCH");
    assert_eq!(response.json()["name"], "ada");

    let response = common::send(&router, json_request("DELETE", "/profile", None)).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, PUT, PATCH"));
}

#[tokio::test]
async fn test_controller_error_reaches_boundary() {
    let router = application(AppConfig::default());
    let response = common::send(&router, json_request("PUT", "/profile", Some("other=1"))).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"]["type"], "ControllerError");
    assert!(response.json()["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Profile::update"));
}

#[tokio::test]
async fn test_circular_dependency_is_500() {
    let router = application(AppConfig::default());
    let response = common::send(&router, json_request("GET", "/mirror", None)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = &response.json()["error"];
    assert_eq!(error["type"], "ResolveError");
    assert!(error["message"].as_str().unwrap().contains("circular dependency"));
}

#[tokio::test]
async fn test_unresolvable_dependency_names_both_types() {
    let router = application(AppConfig::default());
    let response = common::send(&router, json_request("GET", "/orphan", None)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = response.json()["error"]["message"].as_str().unwrap().to_string();
    assert!(message.contains("Unregistered"));
    assert!(message.contains("Orphan"));
}

#[tokio::test]
async fn test_panicking_action_is_caught() {
    let router = application(AppConfig::default());
    let response = common::send(&router, json_request("GET", "/explode", None)).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"]["type"], "Panic");

    // the server keeps serving
    let response = common::send(&router, json_request("GET", "/profile", None)).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_oversized_body_is_500() {
    let mut config = AppConfig::default();
    config.http.max_body_bytes = 8;
    let router = application(config);

    let response = common::send(&router, json_request("PUT", "/profile", Some("name=a-very-long-name"))).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"]["type"], "BodyError");
}

#[tokio::test]
async fn test_oversized_multipart_body_is_500() {
    let mut config = AppConfig::default();
    config.http.max_body_bytes = 16;
    let router = application(config);

    let body = format!(
        "--B\r\nContent-Disposition: form-data; name=\"name\"\r\n\r\n{}\r\n--B--\r\n",
        "x".repeat(100_000)
    );
    let request = Request::builder()
        .method("PUT")
        .uri("/profile")
        .header("accept", "application/json")
        .header("content-type", "multipart/form-data; boundary=B")
        .body(Body::from(body))
        .unwrap();
    let response = common::send(&router, request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json()["error"]["type"], "BodyError");
}

struct BadVerb;

impl Injectable for BadVerb {
    fn inject(_: &mut Resolver<'_>) -> Result<Self, ResolveError> {
        Ok(BadVerb)
    }
}

impl Controller for BadVerb {
    const NAME: &'static str = "BadVerb";

    fn actions() -> Vec<Action<Self>> {
        vec![Action::new("fetch", |_: Arc<Self>, cx: ActionContext| async move {
            Ok(cx.reply().html(""))
        })
        .route(UrlAttribute::with_verbs("/fetch", ["GET", "FETCH"]))]
    }
}

#[test]
fn test_invalid_verb_aborts_startup() {
    let result = Bootstrap::new(AppConfig::default())
        .controllers(ControllerSet::new().add::<Profile>().add::<BadVerb>())
        .build();

    match result {
        Err(StartupError::Route {
            controller,
            action,
            source: RouteError::InvalidVerb { token, .. },
        }) => {
            assert_eq!((controller, action, token.as_str()), ("BadVerb", "fetch", "FETCH"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("startup should have failed"),
    }
}

#[test]
fn test_explicit_binding_wins_over_autowire() {
    let mut bootstrap = Bootstrap::new(AppConfig::default())
        .controllers(ControllerSet::new().add::<Profile>());
    bootstrap.container_mut().instance(Clock { id: 4242 });
    bootstrap.container_mut().instance(Profile {
        id: 7,
        clock: Arc::new(Clock { id: 1 }),
    });
    let app = bootstrap.build().unwrap();

    assert_eq!(app.container().resolve::<Profile>().unwrap().id, 7);
    assert_eq!(app.container().resolve::<Clock>().unwrap().id, 4242);
}

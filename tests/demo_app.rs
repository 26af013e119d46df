//! The demo application end to end, in process.

use axum::body::Body;
use axum::http::{Request, StatusCode};

mod common;

#[tokio::test]
async fn test_index_renders_with_preload_and_cache() {
    let router = common::demo_router();
    let response = common::send(
        &router,
        Request::get("/").header("host", "example.com").body(Body::empty()).unwrap(),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.header("content-type"), Some("text/html"));
    assert!(response.body.contains("It works!"));
    assert!(response.body.contains("example.com"));
    assert_eq!(response.header("link"), Some("</css/site.css>; rel=preload;"));
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=60, proxy-revalidate")
    );
    assert!(response.header("expires").is_some());
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert_eq!(response.header("access-control-allow-methods"), Some("*"));
}

#[tokio::test]
async fn test_helloworld_default_and_capture() {
    let router = common::demo_router();

    let response = common::get(&router, "/helloworld").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Hello World!"));
    assert!(response.header("cache-control").is_none());

    let response = common::get(&router, "/helloworld/alice").await;
    assert!(response.body.contains("Hello alice!"));

    let response = common::get(&router, "/helloworld/alice/extra").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_helloworld_json_variant() {
    let router = common::demo_router();
    let response = common::get(&router, "/helloworld/bob?format=json").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["greeting"], "Hello bob!");
    assert_eq!(
        response.header("cache-control"),
        Some("public, max-age=30, proxy-revalidate")
    );
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let router = common::demo_router();
    let response = common::get(&router, "/nope").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_wrong_verb_is_405_with_allow() {
    let router = common::demo_router();

    let response = common::send(&router, Request::delete("/login").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));

    // methods outside the canonical six never match
    let response = common::send(&router, Request::head("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET"));
}

#[tokio::test]
async fn test_login_round_trip_sets_session_flag() {
    let router = common::demo_router();

    let form = common::get(&router, "/login").await;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("<form method=\"post\""));
    let cookie = form.cookie().expect("session cookie issued");
    assert!(cookie.starts_with("SESSIONID="));

    let response = common::get(&router, "/account").await;
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.header("location"), Some("/login"));

    let response = common::send(
        &router,
        Request::post("/login")
            .header("cookie", &cookie)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("username=ada&password=hunter2"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Welcome, ada!"));
    assert!(!response.body.contains("hunter2"));
    assert!(response.header("set-cookie").is_none());

    let response = common::send(
        &router,
        Request::get("/account").header("cookie", &cookie).body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Signed in as <strong>ada</strong>"));

    let response = common::send(
        &router,
        Request::get("/login").header("cookie", &cookie).body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.body.contains("already logged in"));
}

#[tokio::test]
async fn test_login_with_blank_username_fails() {
    let router = common::demo_router();
    let response = common::send(
        &router,
        Request::post("/login")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("username=+&password=x"))
            .unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.contains("Login failed"));
}

#[tokio::test]
async fn test_whoops_renders_per_accept_header() {
    let router = common::demo_router();

    let response = common::send(
        &router,
        Request::get("/whoops").header("accept", "application/json").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"]["type"], "ControllerError");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("whoops, i made a boo boo"));

    let response = common::send(
        &router,
        Request::get("/whoops").header("accept", "application/xml").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.body.starts_with("<?xml"));

    let response = common::send(
        &router,
        Request::get("/whoops").header("accept", "text/plain").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.body.starts_with("500 Internal Server Error"));

    let response = common::send(
        &router,
        Request::get("/whoops").header("accept", "image/avif").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.header("content-type").unwrap().starts_with("text/html"));
    assert!(response.body.contains("<h1>ControllerError</h1>"));
}

#[tokio::test]
async fn test_debug_mode_shows_request_headers() {
    let mut config = common::demo_config();
    config.app.debug = true;
    let router = common::router(common::demo_app(config));

    let response = common::send(
        &router,
        Request::get("/whoops").header("x-client-note", "visible").body(Body::empty()).unwrap(),
    )
    .await;
    assert!(response.body.contains("<td>x-client-note</td><td>visible</td>"));
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let router = common::demo_router();

    let response = common::get(&router, "/").await;
    let generated = response.header("x-request-id").unwrap();
    assert_eq!(generated.len(), 36);

    let response = common::send(
        &router,
        Request::get("/").header("x-request-id", "abc-123").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(response.header("x-request-id"), Some("abc-123"));
}

#[tokio::test]
async fn test_route_listing() {
    let app = common::demo_app(common::demo_config());
    let routes: Vec<(String, String, String)> = app
        .routes()
        .map(|r| (r.verbs().to_string(), r.pattern().to_string(), r.target()))
        .collect();

    assert_eq!(
        routes,
        vec![
            ("GET".into(), "/".into(), "Index::index".into()),
            ("GET".into(), "/helloworld[/{name}]".into(), "Index::hello".into()),
            ("GET".into(), "/login".into(), "Login::form".into()),
            ("POST".into(), "/login".into(), "Login::submit".into()),
            ("GET".into(), "/account".into(), "Login::account".into()),
            ("GET".into(), "/whoops".into(), "WhoopsTest::whoops".into()),
        ]
    );
    assert_eq!(app.middleware(), vec!["access-log", "session-cookie"]);
}

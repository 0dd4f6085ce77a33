//! Live server tests over a real socket.

mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{root, TestServer};
use switchyard::config::{AuthConfig, CorsConfig, ServerConfig};
use switchyard::http::{handler_fn, Request};
use switchyard::middleware::{
    AccessLogMiddleware, BearerAuthMiddleware, CorsMiddleware, Principal,
    SecurityHeadersMiddleware,
};
use switchyard::routing::ViewSet;
use switchyard::RouterNode;

fn app(config: &ServerConfig) -> RouterNode {
    let mut root = root();
    root.use_middleware(AccessLogMiddleware::new());
    root.use_middleware(SecurityHeadersMiddleware::new(&config.security_headers));
    if config.cors.enabled {
        root.use_middleware(CorsMiddleware::new(&config.cors));
    }

    root.path(
        "health",
        ViewSet::new().get(handler_fn(|_req: Request| async { json!({"status": "ok"}) })),
    )
    .unwrap();

    let api = root.include("api/").unwrap();
    if config.auth.enabled {
        api.use_middleware(BearerAuthMiddleware::new(&config.auth));
    }
    api.path(
        "users/<int:id>",
        ViewSet::new().get(handler_fn(|req: Request| async move {
            let id: i64 = req.path_params.get("id")?;
            let caller = req
                .extensions
                .get::<Principal>()
                .map(|p| p.name.clone())
                .unwrap_or_default();
            Ok::<_, switchyard::http::ParamError>(json!({"id": id, "caller": caller}))
        })),
    )
    .unwrap();
    api.path(
        "boom",
        ViewSet::new().get(handler_fn(|_req: Request| async {
            if true {
                panic!("kaboom");
            }
            StatusCode::OK
        })),
    )
    .unwrap();
    root
}

async fn start(config: ServerConfig) -> TestServer {
    let router = app(&config);
    TestServer::start(config, router).await
}

#[tokio::test]
async fn test_typed_route_over_http() {
    let server = start(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/users/42")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["id"], 42);

    let resp = client.get(server.url("/api/users/abc")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    server.stop().await;
}

#[tokio::test]
async fn test_method_not_allowed_over_http() {
    let server = start(ServerConfig::default()).await;

    let resp = reqwest::Client::new()
        .delete(server.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()["allow"], "GET, HEAD");

    server.stop().await;
}

#[tokio::test]
async fn test_panic_becomes_500_and_server_survives() {
    let server = start(ServerConfig::default()).await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/boom")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "internal_server_error");
    assert!(body.get("detail").is_none());

    let resp = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_bearer_auth_guards_subtree() {
    let config = ServerConfig {
        auth: AuthConfig {
            enabled: true,
            tokens: vec!["alice:s3cret".to_string()],
            ..AuthConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = start(config).await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/api/users/1")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.headers()["www-authenticate"]
        .to_str()
        .unwrap()
        .starts_with("Bearer"));

    let resp = client
        .get(server.url("/api/users/1"))
        .bearer_auth("s3cret")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["caller"], "alice");

    // outside the guarded subtree
    let resp = client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn test_cors_preflight() {
    let config = ServerConfig {
        cors: CorsConfig {
            enabled: true,
            allow_origins: vec!["https://app.example".to_string()],
            ..CorsConfig::default()
        },
        ..ServerConfig::default()
    };
    let server = start(config).await;

    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, server.url("/api/users/1"))
        .header("origin", "https://app.example")
        .header("access-control-request-method", "GET")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        resp.headers()["access-control-allow-origin"],
        "https://app.example"
    );

    server.stop().await;
}

#[tokio::test]
async fn test_graceful_shutdown_stops_accepting() {
    let server = start(ServerConfig::default()).await;
    let url = server.url("/health");

    let resp = reqwest::get(&url).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await;
    assert!(reqwest::get(&url).await.is_err());
}

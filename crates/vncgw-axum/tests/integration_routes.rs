//! Integration tests for the gateway router.
//!
//! Helpers are replaced by shell scripts, so these tests exercise the full
//! connect sequence without an X server.
#![cfg(unix)]

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::Sandbox;
use vncgw_axum::{AppState, bootstrap, create_router};

const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
const MOBILE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

fn app(config: vncgw_core::GatewayConfig) -> (AppState, Router) {
    let state: AppState = Arc::new(bootstrap(config).unwrap());
    let router = create_router(Arc::clone(&state));
    (state, router)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, String) {
    send(router, Method::GET, uri, DESKTOP_UA).await
}

async fn send(router: &Router, method: Method, uri: &str, ua: &str) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::USER_AGENT, ua)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8_lossy(&body).into_owned())
}

#[tokio::test]
async fn root_serves_redirect_script() {
    let sandbox = Sandbox::new();
    let (_state, router) = app(sandbox.config(5931));

    let (status, body) = get(&router, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("window.innerWidth"));
    assert!(body.contains("window.location.replace"));

    let (_, again) = get(&router, "/").await;
    assert_ne!(body, again, "each visit gets a fresh client id");
}

#[tokio::test]
async fn session_path_starts_pipeline() {
    let sandbox = Sandbox::new();
    let (state, router) = app(sandbox.config(5932));

    let (status, body) = get(&router, "/abc_800_600").await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert!(body.contains(":5932/websockify"));
    assert!(body.contains("rfb.qualityLevel = 6;"));
    assert!(body.contains("<title>demo-app</title>"));

    let env = sandbox.app_env().await;
    assert!(env.contains("VNCGW=1"));
    assert!(env.contains("DISPLAY=:1"));
    assert!(env.contains("VNCGW_WIDTH=800"));
    assert!(env.contains("VNCGW_HEIGHT=600"));
    assert_eq!(state.gateway.session_count(), 1);

    state.gateway.shutdown().await;
}

#[tokio::test]
async fn connected_session_redirects() {
    let sandbox = Sandbox::new();
    let (state, router) = app(sandbox.config(5933));

    let (status, _) = get(&router, "/abc_800_600").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&router, "/abc_1024_768").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("window.location.replace"));
    assert!(!body.contains("/abc_"));
    assert_eq!(state.gateway.session_count(), 1);

    state.gateway.shutdown().await;
}

#[tokio::test]
async fn mobile_user_agent_is_forwarded() {
    let sandbox = Sandbox::new();
    let (state, router) = app(sandbox.config(5934));

    let (status, _) = send(&router, Method::GET, "/phone_390_844", MOBILE_UA).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sandbox.app_env().await.contains("VNCGW_MOBILE=1"));

    state.gateway.shutdown().await;
}

#[tokio::test]
async fn malformed_paths_are_bad_requests() {
    let sandbox = Sandbox::new();
    let (state, router) = app(sandbox.config(5935));

    for uri in [
        "/abc_800",
        "/abc_wide_600",
        "/abc_800_600_1",
        "/a.b_800_600",
        "/abc_800_600/x",
        "/abc_800_600/x/y",
    ] {
        let (status, _) = get(&router, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
    assert_eq!(state.gateway.session_count(), 0);
}

#[tokio::test]
async fn other_methods_are_rejected() {
    let sandbox = Sandbox::new();
    let (state, router) = app(sandbox.config(5936));

    let (status, _) = send(&router, Method::POST, "/", DESKTOP_UA).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    let (status, _) = send(&router, Method::DELETE, "/abc_800_600", DESKTOP_UA).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(state.gateway.session_count(), 0);
}

#[tokio::test]
async fn exhausted_displays_are_too_many_requests() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.lock_dir().join(".X1-lock"), b"").unwrap();
    let (state, router) = app(sandbox.config(5937).with_max_display(2));

    for i in 0..50 {
        let (status, body) = get(&router, &format!("/id{i}_800_600")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "body: {body}");
    }
    assert_eq!(state.gateway.session_count(), 0);
    state.gateway.shutdown().await;
}

#[tokio::test]
async fn missing_helper_is_failed_dependency() {
    let sandbox = Sandbox::new();
    let mut config = sandbox.config(5938);
    config.helpers.display_server = sandbox.root().join("no-such-Xvfb");
    let (state, router) = app(config);

    let (status, body) = get(&router, "/abc_800_600").await;
    assert_eq!(status, StatusCode::FAILED_DEPENDENCY);
    assert!(body.contains("display server"));
    state.gateway.shutdown().await;
}

#[tokio::test]
async fn broken_viewer_template_is_internal_error() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.assets_dir().join("viewer.html"),
        "<html>{{TITLE}}</html>",
    )
    .unwrap();
    let (state, router) = app(sandbox.config(5939));

    let (status, _) = get(&router, "/abc_800_600").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!sandbox.root().join("app.env").exists());
    state.gateway.shutdown().await;
}

#[tokio::test]
async fn static_assets_are_served() {
    let sandbox = Sandbox::new();
    let (_state, router) = app(sandbox.config(5940));

    let (status, body) = get(&router, "/core/rfb.js").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class RFB"));

    let (status, body) = get(&router, "/favicon.ico").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ico");

    let (status, _) = get(&router, "/vendor/missing.js").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn serve_stops_on_shutdown_signal() {
    let sandbox = Sandbox::new();
    let ctx = bootstrap(sandbox.config(5941)).unwrap();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(vncgw_axum::serve(ctx, listener, async {
        let _ = rx.await;
    }));
    tx.send(()).unwrap();

    tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

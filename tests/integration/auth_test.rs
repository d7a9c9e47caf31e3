//! Integration tests for login and token-gated admission over HTTP.

mod helpers;

use http::StatusCode;
use serde_json::json;

use tether_core::config::AppConfig;

#[tokio::test]
async fn test_login_issues_token() {
    let app = helpers::TestApp::new();

    let otp = app.login().await;

    assert_eq!(otp.len(), 43);
    assert_eq!(app.engine.tokens.len(), 1);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = helpers::TestApp::new();

    let body = json!({"username": helpers::USERNAME, "password": "wrong"}).to_string();
    let response = app.request("POST", "/login", Some(body), &[]).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["error"], "UNAUTHORIZED");
    assert!(app.engine.tokens.is_empty());
}

#[tokio::test]
async fn test_login_malformed_body() {
    let app = helpers::TestApp::new();

    let response = app
        .request("POST", "/login", Some("{\"username\":".to_string()), &[])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ws_without_token() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/ws", None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.request("GET", "/ws?otp=", None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_disallowed_origin_keeps_token() {
    let mut config = AppConfig::default();
    config.server.cors.allowed_origins = vec!["https://chat.example".to_string()];
    let app = helpers::TestApp::with_config(config);

    let otp = app.login().await;
    let path = format!("/ws?otp={otp}");

    let response = app
        .request("GET", &path, None, &[("Origin", "https://evil.example")])
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);

    // The rejected request did not consume the token
    assert!(app.engine.registry.authorize(Some(&otp)).is_ok());
}

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None, &[]).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["connections"], 0);
    assert!(response.body["metrics"].is_object());
}

//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use futures::StreamExt;
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use tether_auth::CredentialVerifier;
use tether_core::config::AppConfig;
use tether_core::result::AppResult;
use tether_realtime::RealtimeEngine;
use tether_realtime::handlers::default_router;

/// Username accepted by [`StaticVerifier`]
pub const USERNAME: &str = "percy";
/// Password accepted by [`StaticVerifier`]
pub const PASSWORD: &str = "123";

/// Client side of a test WebSocket
pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Accepts exactly one username/password pair.
struct StaticVerifier;

#[async_trait]
impl CredentialVerifier for StaticVerifier {
    async fn verify(&self, username: &str, password: &str) -> AppResult<bool> {
        Ok(username == USERNAME && password == PASSWORD)
    }
}

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Engine behind the router
    pub engine: RealtimeEngine,
    /// Address of the spawned server, if any
    pub addr: Option<SocketAddr>,
}

impl TestApp {
    /// Create a test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a test application with a custom configuration
    pub fn with_config(config: AppConfig) -> Self {
        let engine = RealtimeEngine::new(
            config.realtime.clone(),
            &config.auth,
            default_router().expect("default router"),
        )
        .expect("engine");
        let state = tether_api::AppState::new(config, engine.clone(), Arc::new(StaticVerifier));

        Self {
            router: tether_api::build_router(state),
            engine,
            addr: None,
        }
    }

    /// Serve the router on an ephemeral local port
    pub async fn spawn() -> Self {
        let mut app = Self::new();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        app.addr = Some(listener.local_addr().expect("local addr"));

        let router = app.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("test server failed");
        });
        app
    }

    /// Make a request to the test app
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body.unwrap_or_default()))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Log in and return the one-time token
    pub async fn login(&self) -> String {
        let body = json!({"username": USERNAME, "password": PASSWORD}).to_string();
        let response = self.request("POST", "/login", Some(body), &[]).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["otp"]
            .as_str()
            .expect("otp missing from login response")
            .to_string()
    }

    /// `ws://` URL for the spawned server
    pub fn ws_url(&self, otp: &str) -> String {
        let addr = self.addr.expect("TestApp::spawn not used");
        format!("ws://{addr}/ws?otp={otp}")
    }

    /// Open a WebSocket with `otp` and wait until the engine registered it
    pub async fn connect(&self, otp: &str) -> Client {
        let before = self.engine.registry.len();
        let (client, _) = tokio_tungstenite::connect_async(self.ws_url(otp))
            .await
            .expect("WebSocket connect failed");
        self.wait_for_connections(before + 1).await;
        client
    }

    /// Poll until the registry holds `count` connections
    pub async fn wait_for_connections(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.engine.registry.len() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("registry never reached {count} connections"));
    }
}

/// Next text frame, skipping control frames
pub async fn next_text(client: &mut Client) -> Value {
    loop {
        match client.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(text.as_str()).expect("text frame is not JSON");
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            other => panic!("expected text frame, got {other:?}"),
        }
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

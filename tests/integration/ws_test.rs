//! Integration tests for WebSocket admission and messaging.

mod helpers;

use std::time::Duration;

use futures::SinkExt;
use http::StatusCode;
use serde_json::json;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use helpers::{TestApp, next_text};

fn event(value: serde_json::Value) -> Message {
    Message::Text(value.to_string().into())
}

fn assert_unauthorized(err: WsError) {
    match err {
        WsError::Http(response) => assert_eq!(response.status(), StatusCode::UNAUTHORIZED),
        other => panic!("expected HTTP 401, got {other}"),
    }
}

#[tokio::test]
async fn test_token_is_single_use() {
    let app = TestApp::spawn().await;
    let otp = app.login().await;

    let _c1 = app.connect(&otp).await;

    let err = tokio_tungstenite::connect_async(app.ws_url(&otp))
        .await
        .err()
        .expect("reused token was admitted");
    assert_unauthorized(err);
    assert_eq!(app.engine.registry.len(), 1);
}

#[tokio::test]
async fn test_unknown_token_rejected() {
    let app = TestApp::spawn().await;

    let err = tokio_tungstenite::connect_async(app.ws_url("bogus"))
        .await
        .err()
        .expect("unknown token was admitted");
    assert_unauthorized(err);
    assert!(app.engine.registry.is_empty());
}

#[tokio::test]
async fn test_broadcast_skips_sender() {
    let app = TestApp::spawn().await;
    let mut c1 = app.connect(&app.login().await).await;
    let mut c2 = app.connect(&app.login().await).await;

    c1.send(event(json!({"type": "broadcast", "payload": {"hello": "world"}})))
        .await
        .expect("send");

    let received = next_text(&mut c2).await;
    assert_eq!(received["type"], "broadcast");
    assert_eq!(received["payload"]["hello"], "world");

    let echoed = tokio::time::timeout(Duration::from_millis(300), next_text(&mut c1)).await;
    assert!(echoed.is_err(), "sender received its own broadcast");
}

#[tokio::test]
async fn test_unknown_event_keeps_connection() {
    let app = TestApp::spawn().await;
    let mut c1 = app.connect(&app.login().await).await;
    let mut c2 = app.connect(&app.login().await).await;

    c1.send(event(json!({"type": "does_not_exist", "payload": {}})))
        .await
        .expect("send");
    c1.send(event(json!({"type": "broadcast", "payload": 1})))
        .await
        .expect("send");

    assert_eq!(next_text(&mut c2).await["payload"], 1);
    assert_eq!(app.engine.registry.len(), 2);
}

#[tokio::test]
async fn test_chat_rooms() {
    let app = TestApp::spawn().await;
    let mut c1 = app.connect(&app.login().await).await;
    let mut c2 = app.connect(&app.login().await).await;

    c2.send(event(json!({"type": "change_room", "payload": {"name": "rust"}})))
        .await
        .expect("send");
    c1.send(event(json!({"type": "change_room", "payload": {"name": "rust"}})))
        .await
        .expect("send");

    // Room changes on different connections are not ordered relative to each other
    tokio::time::timeout(Duration::from_secs(2), async {
        while !app.engine.registry.connections().iter().all(|c| c.room() == "rust") {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("room change not applied");

    c1.send(event(json!({
        "type": "send_message",
        "payload": {"message": "hello", "from": "percy"}
    })))
    .await
    .expect("send");

    for client in [&mut c1, &mut c2] {
        let msg = next_text(client).await;
        assert_eq!(msg["type"], "new_message");
        assert_eq!(msg["payload"]["message"], "hello");
        assert!(msg["payload"]["sent"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_message_closes_connection() {
    let app = TestApp::spawn().await;
    let mut c1 = app.connect(&app.login().await).await;

    c1.send(Message::Text("not json".into())).await.expect("send");

    app.wait_for_connections(0).await;
}

#[tokio::test]
async fn test_client_close_removes_connection() {
    let app = TestApp::spawn().await;
    let mut c1 = app.connect(&app.login().await).await;

    c1.close(None).await.expect("close");

    app.wait_for_connections(0).await;
    assert_eq!(app.engine.metrics.snapshot().connections_active, 0);
}

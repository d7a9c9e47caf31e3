//! WebSocket admission and the axum socket → [`Transport`] adapter.

use std::error::Error as StdError;
use std::io;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::http::header::ORIGIN;
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt, future};
use serde::Deserialize;
use tracing::{debug, warn};

use tether_core::error::AppError;
use tether_realtime::connection::transport::CLOSE_ABNORMAL;
use tether_realtime::{Frame, Transport, TransportError};

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// One-time token from `POST /login`.
    pub otp: Option<String>,
}

/// GET /ws?otp={token}: WebSocket upgrade
///
/// The origin is checked before the token is consumed, so a rejected
/// origin does not burn a valid token.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let Some(otp) = query.otp.filter(|otp| !otp.is_empty()) else {
        return Err(AppError::unauthorized("Missing admission token").into());
    };

    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    if !state.config.server.cors.is_origin_allowed(origin) {
        warn!(origin = ?origin, "Rejected WebSocket origin");
        return Err(AppError::forbidden("Origin not allowed").into());
    }

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return Ok(rejection.into_response()),
    };

    let admission = state.engine.registry.authorize(Some(&otp))?;

    let limit = state.config.realtime.max_message_size;
    let registry = state.engine.registry.clone();
    Ok(ws
        .max_message_size(limit)
        .max_frame_size(limit)
        .on_failed_upgrade(|e| warn!(error = %e, "WebSocket upgrade failed"))
        .on_upgrade(move |socket| async move {
            registry.admit_authorized(admission, into_transport(socket));
        }))
}

/// Adapts an upgraded socket to the engine's frame transport.
pub fn into_transport(socket: WebSocket) -> Transport {
    let (sink, stream) = socket.split();

    let sink = sink
        .with(|frame: Frame| future::ready(Ok::<_, axum::Error>(to_message(frame))))
        .sink_map_err(|e| TransportError::Io(e.to_string()));

    let stream = stream.map(|msg| match msg {
        Ok(msg) => Ok(from_message(msg)),
        Err(e) => {
            debug!(error = %e, "WebSocket read failed");
            Err(read_error(&e))
        }
    });

    Transport::new(sink, stream)
}

/// A socket that vanished without a close handshake reads as an abnormal
/// closure (1006); anything else is an I/O failure.
fn read_error(err: &axum::Error) -> TransportError {
    if is_abnormal_closure(err) {
        TransportError::Closed {
            code: Some(CLOSE_ABNORMAL),
        }
    } else {
        TransportError::Io(err.to_string())
    }
}

fn is_abnormal_closure(err: &axum::Error) -> bool {
    let mut cause = Some(err as &(dyn StdError + 'static));
    while let Some(err) = cause {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        let text = err.to_string().to_lowercase();
        if text.contains("without closing handshake")
            || text.contains("connection closed")
            || text.contains("closed connection")
        {
            return true;
        }
        cause = err.source();
    }
    false
}

fn to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::Text(text.into()),
        Frame::Binary(data) => Message::Binary(data),
        Frame::Ping(data) => Message::Ping(data),
        Frame::Pong(data) => Message::Pong(data),
        Frame::Close(code) => Message::Close(code.map(|code| CloseFrame {
            code,
            reason: Utf8Bytes::from_static(""),
        })),
    }
}

fn from_message(msg: Message) -> Frame {
    match msg {
        Message::Text(text) => Frame::Text(text.as_str().to_owned()),
        Message::Binary(data) => Frame::Binary(data),
        Message::Ping(data) => Frame::Ping(data),
        Message::Pong(data) => Frame::Pong(data),
        Message::Close(frame) => Frame::Close(frame.map(|f| f.code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_survives_conversion() {
        let msg = to_message(Frame::Close(Some(1001)));
        assert_eq!(from_message(msg), Frame::Close(Some(1001)));
        assert_eq!(from_message(to_message(Frame::Close(None))), Frame::Close(None));
    }

    #[test]
    fn test_reset_reads_as_abnormal_closure() {
        let reset = axum::Error::new(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
        let err = read_error(&reset);
        assert!(matches!(err, TransportError::Closed { code: Some(CLOSE_ABNORMAL) }));
        assert!(err.is_expected());

        let gone = axum::Error::new(io::Error::other("Connection reset without closing handshake"));
        assert!(read_error(&gone).is_expected());
    }

    #[test]
    fn test_other_read_errors_stay_unexpected() {
        let err = read_error(&axum::Error::new(io::Error::other("invalid opcode")));
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.is_expected());
    }

    #[test]
    fn test_text_conversion() {
        let msg = to_message(Frame::Text(r#"{"type":"broadcast"}"#.to_string()));
        assert!(matches!(&msg, Message::Text(t) if t.as_str() == r#"{"type":"broadcast"}"#));
    }
}

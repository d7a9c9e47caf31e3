//! JSON encoding for the wire envelope.

use tether_core::error::{AppError, ErrorKind};

use super::types::Event;

/// Decode one inbound text frame into an [`Event`].
///
/// Any malformed input is a [`Decode`](ErrorKind::Decode) error.
pub fn decode_event(text: &str) -> Result<Event, AppError> {
    serde_json::from_str(text)
        .map_err(|e| AppError::with_source(ErrorKind::Decode, format!("malformed event: {e}"), e))
}

/// Encode an outbound [`Event`] as a text frame.
pub fn encode_event(event: &Event) -> Result<String, AppError> {
    serde_json::to_string(event).map_err(|e| {
        AppError::with_source(
            ErrorKind::Internal,
            format!("failed to encode '{}' event: {e}", event.event_type),
            e,
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_envelope() {
        let event = decode_event(r#"{"type":"send_message","payload":{"message":"hi"}}"#)
            .expect("decode");
        assert_eq!(event.event_type, "send_message");
        assert_eq!(event.payload, json!({"message": "hi"}));
    }

    #[test]
    fn test_missing_payload_defaults_to_null() {
        let event = decode_event(r#"{"type":"ping_me"}"#).expect("decode");
        assert!(event.payload.is_null());
    }

    #[test]
    fn test_missing_type_is_decode_error() {
        let err = decode_event(r#"{"payload":{}}"#).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = decode_event("not json at all").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Decode);
    }

    #[test]
    fn test_encode_uses_type_key() {
        let text = encode_event(&Event::new("broadcast", json!("x"))).expect("encode");
        assert_eq!(text, r#"{"type":"broadcast","payload":"x"}"#);
    }
}

//! Frame Codec
//!
//! Converts between wire bytes and frame values. The core only requires a
//! registered [`FrameCodec`]; the shipped [`JsonCodec`] uses a JSON envelope
//! of the form `{"path": "...", "payload": ...}`.

use thiserror::Error;

use crate::dispatch::frame::{InboundFrame, OutboundFrame};

/// Errors raised while encoding or decoding frames
#[derive(Error, Debug)]
pub enum CodecError {
    /// Wire bytes could not be decoded into a frame
    #[error("Payload decode error: {0}")]
    Decode(String),

    /// Frame could not be encoded to wire bytes
    #[error("Payload encode error: {0}")]
    Encode(String),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

/// Converts between declared frame values and wire bytes
pub trait FrameCodec: Send + Sync {
    /// Decode wire bytes into an inbound frame
    fn decode(&self, bytes: &[u8]) -> CodecResult<InboundFrame>;

    /// Encode an outbound frame to wire bytes
    fn encode(&self, frame: &OutboundFrame) -> CodecResult<Vec<u8>>;
}

/// JSON envelope codec
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl FrameCodec for JsonCodec {
    fn decode(&self, bytes: &[u8]) -> CodecResult<InboundFrame> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }

    fn encode(&self, frame: &OutboundFrame) -> CodecResult<Vec<u8>> {
        serde_json::to_vec(frame).map_err(|e| CodecError::Encode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_envelope() {
        let frame = JsonCodec
            .decode(br#"{"path": "/rooms/42", "payload": {"text": "hi"}}"#)
            .unwrap();
        assert_eq!(frame.path, "/rooms/42");
        assert_eq!(frame.payload["text"], "hi");
    }

    #[test]
    fn test_decode_rejects_invalid_json() {
        let result = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_missing_path() {
        let result = JsonCodec.decode(br#"{"payload": 1}"#);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_encode_roundtrips_through_decode() {
        let frame = OutboundFrame::new("/rooms/42", json!({"text": "hi"}));
        let bytes = JsonCodec.encode(&frame).unwrap();

        let decoded: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded["path"], "/rooms/42");
        assert_eq!(decoded["payload"]["text"], "hi");
    }
}

//! serde_json message codec.

use crate::domain::error::CodecError;
use crate::ports::MessageCodec;
use bytes::Bytes;
use serde_json::Value;

/// UTF-8 JSON text frames, one JSON-RPC object per frame
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode(&self, message: &Value) -> Result<Bytes, CodecError> {
        Ok(Bytes::from(serde_json::to_vec(message)?))
    }

    fn decode(&self, frame: &[u8]) -> Result<Value, CodecError> {
        let value: Value = serde_json::from_slice(frame)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        Ok(value)
    }
}

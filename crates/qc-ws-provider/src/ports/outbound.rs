//! Outbound ports for the provider.
//!
//! The provider never opens sockets or parses bytes itself. A `Transport`
//! moves whole frames, a `MessageCodec` turns frames into JSON values.

use crate::domain::error::{CodecError, TransportError};
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

/// Persistent, ordered, bidirectional frame transport
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one encoded frame
    async fn send(&self, frame: Bytes) -> Result<(), TransportError>;

    /// Receive the next inbound frame, waiting as long as it takes.
    ///
    /// Must be cancel safe: the provider drops this future when a deadline
    /// passes, and a frame must not be consumed unless it is returned.
    /// Fails with [`TransportError::Closed`] on disconnect.
    async fn receive(&self) -> Result<Bytes, TransportError>;

    /// Close the transport. Later sends and receives fail.
    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Frame <-> JSON message codec
pub trait MessageCodec: Send + Sync {
    fn encode(&self, message: &Value) -> Result<Bytes, CodecError>;

    fn decode(&self, frame: &[u8]) -> Result<Value, CodecError>;
}

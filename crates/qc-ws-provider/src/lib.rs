//! QC WebSocket Provider - request/response correlation over a persistent
//! JSON-RPC transport.
//!
//! A long-lived websocket delivers responses in any order relative to the
//! requests that solicited them, interleaved with subscription pushes nobody
//! asked for. This crate matches each inbound message to its request by
//! correlation id, caches responses that arrive before (or after) their
//! waiter looks for them, and buffers unsolicited messages in arrival order.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       WsProvider                             │
//! │                                                              │
//! │  make_request ──▶ RequestIdGenerator ──▶ Transport::send     │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  ResponseCache::take ──hit──▶ return                         │
//! │       │ miss                                                 │
//! │       ▼                                                      │
//! │  reader slot ──▶ Transport::receive ──▶ classify             │
//! │                                           │                  │
//! │              ┌────────────────────────────┼──────────┐       │
//! │              ▼                            ▼          ▼       │
//! │         own id: return          other id: cache   push:      │
//! │                                           UnsolicitedBuffer  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use qc_ws_provider::{channel_pair, ProviderConfig, WsProvider};
//!
//! let (transport, remote) = channel_pair();
//! let provider = WsProvider::new(transport, ProviderConfig::for_endpoint("ws://node"))?;
//! let response = provider.make_request("eth_blockNumber", json!([]), None).await?;
//! let pushes = provider.drain_unsolicited();
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;
pub mod telemetry;

// Re-exports for public API
pub use adapters::{channel_pair, ChannelTransport, JsonCodec, RemoteEnd};
pub use domain::config::{ConfigError, ProviderConfig};
pub use domain::correlation::{ConnectionId, RequestId, RequestIdGenerator};
pub use domain::error::{
    codes, CodecError, ProviderError, ProviderResult, RpcError, TransportError,
};
pub use domain::message::{RpcRequest, RpcResponse};
pub use domain::pending::StatsSnapshot;
pub use domain::{Classified, ResponseCache, UnsolicitedBuffer};
pub use ports::{MessageCodec, Transport};
pub use service::{WsProvider, WsProviderBuilder};
pub use telemetry::{
    build_subscriber, init_tracing, BoxedSubscriber, TelemetryConfig, TelemetryError,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}

//! Domain types for the provider.
//!
//! This module contains correlation ids, the response cache, the
//! unsolicited buffer, the classifier, configuration and error handling.
//! Transport and codec seams are in `ports`.

pub mod buffer;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod correlation;
pub mod error;
pub mod message;
pub mod pending;

// Re-exports for convenience
pub use buffer::UnsolicitedBuffer;
pub use cache::ResponseCache;
pub use classifier::{classify, Classified};
pub use config::{ConfigError, ProviderConfig};
pub use correlation::{ConnectionId, RequestId, RequestIdGenerator};
pub use error::{CodecError, ProviderError, ProviderResult, RpcError, TransportError};
pub use message::{RpcRequest, RpcResponse, JSONRPC_VERSION};
pub use pending::{PendingGuard, PendingRequests, ProviderStats, StatsSnapshot};

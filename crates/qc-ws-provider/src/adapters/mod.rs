//! Adapters for the provider.
//!
//! Infrastructure implementations of the transport and codec ports.

pub mod channel_transport;
pub mod json_codec;

pub use channel_transport::{channel_pair, ChannelTransport, RemoteEnd};
pub use json_codec::JsonCodec;

//! Ports (hexagonal seams) for the provider.

pub mod outbound;

pub use outbound::{MessageCodec, Transport};
